pub(crate) mod defaults;
pub(crate) mod embedded;
pub(crate) mod model;
pub(crate) mod timeline;
