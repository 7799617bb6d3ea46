pub mod auth;
pub mod sanitize;

pub use auth::{require_auth, CurrentUser};
pub use sanitize::SanitizedJson;
