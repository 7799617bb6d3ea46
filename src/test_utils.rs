//! Test utilities for Release Review
//!
//! Provides helpers for creating isolated test environments with:
//! - In-memory SQLite databases (one per test)
//! - A recording mailer in place of SendGrid
//! - AppState factories
//! - Test data generators

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{
        entities::{
            artist, release,
            user::{self, NewUser},
        },
        enums::ReleaseType,
        types::{IdList, Reviews, TrackList},
    },
    services::{
        mailer::{EmailMessage, MailError, Mailer},
        IntegrityCoordinator,
    },
    state::AppState,
};

/// Satisfies the password strength policy.
pub const TEST_PASSWORD: &str = "Sup3r$ecret";

/// Setup an in-memory SQLite database with all migrations applied
///
/// Each call creates a fresh, isolated database perfect for parallel testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Create a test configuration with sensible defaults
pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 4000,
        jwt_secret: "test-jwt-secret".to_string(),
        frontend_url: "http://localhost:5173".to_string(),
        sendgrid_api_key: None,
        sendgrid_api_url: "http://127.0.0.1:0".to_string(),
        from_email: "noreply@example.com".to_string(),
        confirmation_template_id: Some("tmpl-confirm".to_string()),
        reset_template_id: Some("tmpl-reset".to_string()),
        log_json: false,
    }
}

/// Keeps every message instead of delivering it. Can be switched to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }

    /// The raw token at the end of the link in the most recent message.
    pub fn last_token(&self) -> Option<String> {
        let link = self.sent().last()?.link()?;
        link.rsplit('/').next().map(str::to_string)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected {
                status: 503,
                body: "test mailer is failing".to_string(),
            });
        }
        self.sent
            .lock()
            .expect("mailer lock poisoned")
            .push(message.clone());
        Ok(())
    }
}

/// Create a complete test AppState with an isolated database
pub async fn setup_test_app_state() -> AppState {
    setup_test_app_state_with_mailer().await.0
}

/// Create a test AppState and keep a handle on its mailer for assertions
pub async fn setup_test_app_state_with_mailer() -> (AppState, Arc<RecordingMailer>) {
    let db = setup_test_db().await;
    let mailer = Arc::new(RecordingMailer::new());
    let state = AppState::new(db, test_config(), mailer.clone());
    (state, mailer)
}

/// `Authorization` header value for `user`.
pub fn bearer(state: &AppState, user: &user::Model) -> String {
    format!("Bearer {}", state.sessions.issue(user.id, &user.email))
}

// ============================================================================
// Test Data Factories
// ============================================================================

/// Create a test user whose password is [`TEST_PASSWORD`]
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    confirmed: bool,
) -> user::Model {
    let mut user = NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: TEST_PASSWORD.to_string(),
    }
    .into_active_model()
    .expect("Failed to hash test password");
    user.is_email_confirmed = Set(confirmed);

    user.insert(db).await.expect("Failed to insert test user")
}

pub fn test_artist_model(owner_id: Uuid, name: &str) -> artist::ActiveModel {
    let now = Utc::now().into();
    artist::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        genre: Set("Electronic".to_string()),
        image: Set("https://img.example.com/artist.jpg".to_string()),
        country: Set("UK".to_string()),
        formed_year: Set(1995),
        biography: Set(format!("{} biography", name)),
        releases: Set(IdList::default()),
        user_id: Set(owner_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Create a test artist with no releases
pub async fn create_test_artist(db: &DatabaseConnection, owner_id: Uuid, name: &str) -> artist::Model {
    test_artist_model(owner_id, name)
        .insert(db)
        .await
        .expect("Failed to insert test artist")
}

pub fn test_release_model(owner_id: Uuid, artist_id: Option<Uuid>, title: &str) -> release::ActiveModel {
    let now = Utc::now().into();
    release::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        image: Set("https://img.example.com/cover.jpg".to_string()),
        artist_id: Set(artist_id),
        year: Set(2003),
        genre: Set("Electronic".to_string()),
        track_list: Set(TrackList(vec!["Intro".to_string(), "Outro".to_string()])),
        release_type: Set(ReleaseType::Album),
        reviews: Set(Reviews::default()),
        user_id: Set(owner_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Create a test release, linking it into its artist's release list
pub async fn create_test_release(
    db: &DatabaseConnection,
    owner_id: Uuid,
    artist_id: Option<Uuid>,
    title: &str,
) -> release::Model {
    IntegrityCoordinator::new(db.clone())
        .create_release(test_release_model(owner_id, artist_id, title))
        .await
        .expect("Failed to insert test release")
}
