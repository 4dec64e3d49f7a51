pub(crate) mod config;
pub(crate) mod handles;
pub(crate) mod platform;
pub(crate) mod soft;
pub(crate) mod surface_manager;
pub(crate) mod teardown;
