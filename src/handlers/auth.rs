use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        entities::user::{self, NewUser},
        repositories::UserRepository,
    },
    error::{AppError, Result},
    handlers::{views::AccountView, MessageResponse},
    middleware::SanitizedJson,
    services::{
        credentials::{hash_password, verify_password},
        mailer::{confirmation_email, password_reset_email, EmailMessage},
        tokens::{issue_single_use_token, TokenPurpose},
    },
    state::AppState,
    validation::{check_password_strength, is_valid_email, normalize_email, Validator},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: AccountView,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: AccountView,
    pub token: String,
}

/// Issues a token of `purpose`, stores its digest and mails the raw value.
/// If delivery fails the stored digest is cleared again.
async fn send_single_use_token<F>(
    state: &AppState,
    user: user::Model,
    purpose: TokenPurpose,
    build: F,
) -> Result<()>
where
    F: FnOnce(&str) -> EmailMessage,
{
    let repo = UserRepository::new(state.db.clone());
    let token = issue_single_use_token(purpose);
    let user = repo
        .store_token(user, purpose, Some(token.digest), Some(token.expires_at))
        .await?;

    let message = build(&token.raw);
    if let Err(e) = state.mailer.send(&message).await {
        tracing::error!(user = %user.id, ?purpose, "Email delivery failed: {}", e);
        if let Err(clear_err) = repo.clear_token(user, purpose).await {
            tracing::warn!(?purpose, "Could not clear undelivered token: {}", clear_err);
        }
        return Err(e.into());
    }
    Ok(())
}

pub async fn signup(
    State(state): State<AppState>,
    SanitizedJson(payload): SanitizedJson<SignupRequest>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    let mut v = Validator::new();
    let username = v.required_text("username", payload.username, "Username is required");
    let email = v.required_text("email", payload.email, "Email is required");
    let password = payload.password.filter(|p| !p.is_empty());

    if let Some(email) = &email {
        if !is_valid_email(email) {
            v.add("email", "Please enter a valid email address");
        }
    }
    match &password {
        None => v.add("password", "Password is required"),
        Some(p) => {
            if let Err(msg) = check_password_strength(p) {
                v.add("password", msg);
            }
            if payload.confirm_password.as_deref() != Some(p.as_str()) {
                v.add("confirmPassword", "Passwords do not match");
            }
        }
    }
    v.finish()?;

    let (Some(username), Some(email), Some(password)) = (username, email, password) else {
        return Err(AppError::Internal("Validated signup is incomplete".to_string()));
    };
    let email = normalize_email(&email);

    let repo = UserRepository::new(state.db.clone());
    if repo.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already in use".to_string()));
    }

    let user = repo
        .create(
            NewUser {
                username,
                email,
                password,
            }
            .into_active_model()?,
        )
        .await?;
    tracing::info!(user = %user.id, "User signed up");

    let config = state.config.clone();
    let (to, name) = (user.email.clone(), user.username.clone());
    send_single_use_token(&state, user.clone(), TokenPurpose::EmailConfirmation, |raw| {
        confirmation_email(&config, &to, &name, raw)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User created successfully. Please check your email to confirm your account."
                .to_string(),
            user: AccountView::from(&user),
        }),
    ))
}

pub async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>> {
    let user = UserRepository::new(state.db.clone())
        .consume_token(&token, TokenPurpose::EmailConfirmation, |active| {
            active.is_email_confirmed = Set(true);
        })
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Email confirmation token is invalid or has expired".to_string())
        })?;

    tracing::info!(user = %user.id, "Email confirmed");
    Ok(MessageResponse::new("Email confirmed successfully. You can now log in."))
}

/// Reissues the confirmation link for an account that has not confirmed yet.
pub async fn resend_confirmation(
    State(state): State<AppState>,
    SanitizedJson(payload): SanitizedJson<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let mut v = Validator::new();
    let email = v.required_text("email", payload.email, "Email is required");
    v.finish()?;
    let email = normalize_email(&email.unwrap_or_default());

    let user = UserRepository::new(state.db.clone())
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if user.is_email_confirmed {
        return Err(AppError::BadRequest("Email is already confirmed".to_string()));
    }

    let config = state.config.clone();
    let (to, name) = (user.email.clone(), user.username.clone());
    send_single_use_token(&state, user, TokenPurpose::EmailConfirmation, |raw| {
        confirmation_email(&config, &to, &name, raw)
    })
    .await?;

    Ok(MessageResponse::new("Confirmation email sent."))
}

pub async fn login(
    State(state): State<AppState>,
    SanitizedJson(payload): SanitizedJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let mut v = Validator::new();
    let email = v.required_text("email", payload.email, "Email is required");
    let password = payload.password.filter(|p| !p.is_empty());
    if password.is_none() {
        v.add("password", "Password is required");
    }
    v.finish()?;
    let email = normalize_email(&email.unwrap_or_default());
    let password = password.unwrap_or_default();

    let user = UserRepository::new(state.db.clone())
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

    if !user.is_email_confirmed {
        return Err(AppError::Authentication(
            "Please confirm your email before logging in.".to_string(),
        ));
    }
    if !verify_password(&password, &user.password_hash) {
        tracing::debug!(user = %user.id, "Login rejected, wrong password");
        return Err(AppError::Authentication("Invalid email or password".to_string()));
    }

    let token = state.sessions.issue(user.id, &user.email);
    tracing::info!(user = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user: AccountView::from(&user),
        token,
    }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    SanitizedJson(payload): SanitizedJson<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let mut v = Validator::new();
    let email = v.required_text("email", payload.email, "Email is required");
    v.finish()?;
    let email = normalize_email(&email.unwrap_or_default());

    let user = UserRepository::new(state.db.clone())
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let config = state.config.clone();
    let (to, name) = (user.email.clone(), user.username.clone());
    send_single_use_token(&state, user, TokenPurpose::PasswordReset, |raw| {
        password_reset_email(&config, &to, &name, raw)
    })
    .await?;

    Ok(MessageResponse::new("Password reset email sent."))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    SanitizedJson(payload): SanitizedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let password = payload.password.unwrap_or_default();
    if let Err(msg) = check_password_strength(&password) {
        return Err(AppError::field("password", msg));
    }
    let password_hash = hash_password(&password)?;

    let user = UserRepository::new(state.db.clone())
        .consume_token(&token, TokenPurpose::PasswordReset, |active| {
            active.password_hash = Set(password_hash);
        })
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Password reset token is invalid or has expired".to_string())
        })?;

    tracing::info!(user = %user.id, "Password reset");
    Ok(MessageResponse::new("Password has been reset successfully."))
}
