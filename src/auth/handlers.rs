use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::{post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, ResetPasswordRequest, SigninRequest, SigninResponse,
            SignupRequest, UpdatePasswordRequest,
        },
        extractors::{CurrentUser, Payload},
        services,
    },
    error::{ApiMessage, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signin", post(signin))
        .route("/auth/signup", post(signup))
        .route("/auth/password", put(update_password))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Payload(payload): Payload<SigninRequest>,
) -> AppResult<Json<SigninResponse>> {
    let token = services::signin(&state, payload).await?;
    Ok(Json(SigninResponse {
        success: true,
        message: "Signed in successfully".into(),
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Payload(payload): Payload<SignupRequest>,
) -> AppResult<Json<ApiMessage>> {
    services::signup(&state, payload).await?;
    Ok(Json(ApiMessage::ok("User created successfully")))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Payload(payload): Payload<UpdatePasswordRequest>,
) -> AppResult<Json<ApiMessage>> {
    services::update_password(&state, user, payload).await?;
    Ok(Json(ApiMessage::ok("Password updated successfully")))
}

#[instrument(skip(state, headers, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(payload): Payload<ForgotPasswordRequest>,
) -> AppResult<Json<ApiMessage>> {
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());
    services::forgot_password(&state, payload, host).await?;
    Ok(Json(ApiMessage::ok(
        "An email has been sent to let you reset your password",
    )))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Payload(payload): Payload<ResetPasswordRequest>,
) -> AppResult<Json<ApiMessage>> {
    services::reset_password(&state, payload).await?;
    Ok(Json(ApiMessage::ok("Password updated successfully")))
}
