//! Sign-up, login, and logout endpoints

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::error::Result;
use crate::server::middleware::bearer_token;
use crate::server::state::AppState;
use crate::types::query::{LoginRequest, SignupRequest};
use crate::types::response::{AccountSummary, LoginResponse};

/// POST /auth/signup - Create a new account
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AccountSummary>)> {
    let account = state
        .credentials()
        .create_account(&req.username, &req.email, &req.password)?;

    Ok((StatusCode::CREATED, Json(AccountSummary::from(&account))))
}

/// POST /auth/login - Verify credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let account = state.credentials().verify(&req.username, &req.password)?;
    let session = state.sessions().start_session(&account)?;

    Ok(Json(LoginResponse::from(&session)))
}

/// POST /auth/logout - End the session named by the bearer token.
///
/// Idempotent: logging out with an unknown or already-revoked token succeeds.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions().end_session(&token)?;
    }
    Ok(StatusCode::NO_CONTENT)
}
