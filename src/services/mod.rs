pub mod credentials;
pub mod integrity;
pub mod mailer;
pub mod ownership;
pub mod tokens;

pub use credentials::{hash_password, verify_password};
pub use integrity::IntegrityCoordinator;
pub use mailer::{EmailBody, EmailMessage, LogMailer, MailError, Mailer, SendGridMailer};
pub use ownership::{can_mutate, ensure_can_mutate, Owned};
pub use tokens::{SessionClaims, SessionTokens, SingleUseToken, TokenError, TokenPurpose};
