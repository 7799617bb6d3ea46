use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::services::{mailer::Mailer, tokens::SessionTokens};

/// Shared, read-only handles passed to every request.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub sessions: Arc<SessionTokens>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let sessions = SessionTokens::new(config.jwt_secret.as_bytes());
        Self {
            db,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            mailer,
        }
    }
}
