use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Form, Json,
};
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use super::jwt::JwtKeys;
use crate::{
    error::AppError,
    state::AppState,
    users::User,
};

/// Validates the bearer token and loads the signed-in user's record.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Auth("Missing Authorization header"))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AppError::Auth("Invalid Authorization header"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Auth("Invalid or expired token")
        })?;

        match state.users.find_by_id(claims.sub).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => {
                warn!(user_id = %claims.sub, "token for unknown user");
                Err(AppError::Auth("Invalid or expired token"))
            }
            Err(e) => {
                error!(error = %e, user_id = %claims.sub, "load current user failed");
                Err(AppError::dependency("Unable to load the user", e))
            }
        }
    }
}

/// Request body accepted either as JSON or as an url-encoded form.
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
                warn!(error = %e, "malformed form body");
                AppError::Validation("Malformed request body")
            })?;
            Ok(Payload(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
                warn!(error = %e, "malformed json body");
                AppError::Validation("Malformed request body")
            })?;
            Ok(Payload(value))
        }
    }
}
