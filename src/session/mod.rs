pub(crate) mod clock;
pub(crate) mod render_session;
