use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub password_hash: String,          // argon2 PHC string
    pub reset_token: Option<String>,    // set together with reset_token_expire
    pub reset_token_expire: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// True while the stored token matches and `now` is before its expiry.
    #[cfg(test)]
    pub fn reset_token_matches(&self, token: &str, now: OffsetDateTime) -> bool {
        match (&self.reset_token, self.reset_token_expire) {
            (Some(stored), Some(expire)) => stored == token && expire > now,
            _ => false,
        }
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// Fields needed to insert a user; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub password_hash: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            firstname: u.firstname.clone(),
            lastname: u.lastname.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
