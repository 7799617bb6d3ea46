//! Bearer-token authentication for protected routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{
    db::{entities::user, repositories::UserRepository},
    error::{AppError, Result},
    services::tokens::TokenError,
    state::AppState,
};

/// The authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

/// Resolves `Authorization: Bearer <token>` to a [`CurrentUser`] or rejects
/// the request with 401 before the handler runs.
///
/// Tokens are not revocable: a token for a user that no longer exists is
/// rejected here, but a token issued before a password change still works
/// until it expires.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Unauthorised. No Auth header found.".to_string()))?;

    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();

    let claims = state.sessions.verify(token).map_err(|e| match e {
        TokenError::Expired => AppError::Authentication("Unauthorised. Token expired.".to_string()),
        TokenError::Invalid => AppError::Authentication("Unauthorised. Invalid token.".to_string()),
    })?;

    let user = UserRepository::new(state.db.clone())
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Authentication("User not found. Invalid token.".to_string()))?;

    tracing::debug!(user = %user.id, path = %request.uri().path(), "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
