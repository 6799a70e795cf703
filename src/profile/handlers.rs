use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::extractors::{CurrentUser, Payload},
    error::AppResult,
    profile::{
        dto::{ProfileUpdated, UpdateProfileRequest},
        services,
    },
    state::AppState,
    users::PublicUser,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(services::get_profile(&user))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Payload(payload): Payload<UpdateProfileRequest>,
) -> AppResult<Json<ProfileUpdated>> {
    let data = services::update_profile(&state, user, payload).await?;
    Ok(Json(ProfileUpdated {
        success: true,
        message: "User updated successfully".into(),
        data,
    }))
}
