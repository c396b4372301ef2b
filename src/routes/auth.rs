use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::rate_limit::{check_rate_limit, login_key, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW_SECS},
    models::{
        auth::AuthenticatedUser,
        user::{
            EmailRequest, LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest,
            ResetPasswordRequest, UserProfile, VerifyEmailRequest,
        },
    },
    services::{auth::AuthService, metrics::LOGINS_COUNTER},
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = AuthService::register(&state.db, state.email.as_deref(), &state.config, &body).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    // Rate limit: 5 attempts per 15 min per email
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &login_key(&body.email), LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW_SECS).await?;

    match AuthService::login(&state.db, &state.config, &body.email, &body.password).await {
        Ok(response) => {
            LOGINS_COUNTER.with_label_values(&["success"]).inc();
            Ok(Json(response))
        }
        Err(e) => {
            let err = AppError::from(e);
            let status = match &err {
                AppError::Auth(_) => "rejected",
                _ => "error",
            };
            LOGINS_COUNTER.with_label_values(&[status]).inc();
            Err(err)
        }
    }
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = AuthService::refresh(&state.db, &state.config, &body.refresh_token).await?;
    Ok(Json(response))
}

pub async fn logout(State(state): State<AppState>, user: AuthenticatedUser) -> AppResult<StatusCode> {
    AuthService::logout(&state.db, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> AppResult<Json<UserProfile>> {
    let profile = AuthService::me(&state.db, &state.config, user.user_id).await?;
    Ok(Json(profile))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> AppResult<Json<Value>> {
    AuthService::verify_email(&state.db, &body.token).await?;
    Ok(Json(json!({ "verified": true })))
}

/// Always answers the same way so callers cannot probe which addresses exist.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> AppResult<Json<Value>> {
    AuthService::send_verification_email(&state.db, state.email.as_deref(), &state.config, &body.email)
        .await?;
    Ok(Json(json!({ "message": "If the address needs verifying, a new link is on its way" })))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> AppResult<Json<Value>> {
    AuthService::send_password_reset(&state.db, state.email.as_deref(), &state.config, &body.email).await?;
    Ok(Json(json!({ "message": "If an account exists for this address, a reset link is on its way" })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    AuthService::reset_password(&state.db, &body.token, &body.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}
