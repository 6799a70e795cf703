use tracing::info;

use crate::{
    auth::dto::present_trimmed,
    error::{AppError, AppResult},
    profile::dto::UpdateProfileRequest,
    state::AppState,
    users::{PublicUser, User},
};

pub fn get_profile(user: &User) -> PublicUser {
    user.to_public()
}

/// Replaces both names and returns the stored public view.
pub async fn update_profile(
    state: &AppState,
    user: User,
    req: UpdateProfileRequest,
) -> AppResult<PublicUser> {
    let (Some(firstname), Some(lastname)) =
        (present_trimmed(req.firstname), present_trimmed(req.lastname))
    else {
        return Err(AppError::Validation("Please fill in all required fields"));
    };

    let saved = state
        .users
        .set_names(user.id, &firstname, &lastname)
        .await
        .map_err(|e| AppError::dependency("Unable to update the user", e))?;

    info!(user_id = %saved.id, "profile updated");
    Ok(saved.to_public())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{NewUser, UserStore};

    async fn seeded(state: &AppState) -> User {
        state
            .users
            .insert(NewUser {
                email: "a@x.com".into(),
                firstname: "Ann".into(),
                lastname: "Lee".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn profile_view_has_no_secrets() {
        let fake = AppState::fake();
        let mut user = seeded(&fake.state).await;
        user.reset_token = Some("tok".into());
        user.reset_token_expire = Some(time::OffsetDateTime::now_utc());

        let json = serde_json::to_string(&get_profile(&user)).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("hash"));
        assert!(!json.contains("tok"));
        assert!(!json.contains("reset_token"));
    }

    #[tokio::test]
    async fn update_profile_persists_names() {
        let fake = AppState::fake();
        let user = seeded(&fake.state).await;

        let view = update_profile(
            &fake.state,
            user.clone(),
            UpdateProfileRequest {
                firstname: Some(" Anna ".into()),
                lastname: Some("Lee-Smith".into()),
            },
        )
        .await
        .expect("update profile");
        assert_eq!(view.firstname, "Anna");
        assert_eq!(view.lastname, "Lee-Smith");
        assert_eq!(view.email, "a@x.com");

        let stored = fake.users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.firstname, "Anna");
        assert_eq!(stored.password_hash, "hash");
    }

    #[tokio::test]
    async fn update_profile_requires_both_names() {
        let fake = AppState::fake();
        let user = seeded(&fake.state).await;
        let writes = fake.users.writes();

        let err = update_profile(
            &fake.state,
            user,
            UpdateProfileRequest {
                firstname: Some("Anna".into()),
                lastname: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(fake.users.writes(), writes);
    }
}
