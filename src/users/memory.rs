use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::repo::{StoreError, StoreResult, UserStore};
use crate::users::repo_types::{NewUser, User};

/// Map-backed store used by unit tests.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
    writes: AtomicUsize,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes of any kind.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn modify(&self, id: Uuid, apply: impl FnOnce(&mut User)) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        apply(stored);
        stored.updated_at = OffsetDateTime::now_utc();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.reset_token_matches(token, now))
            .cloned())
    }

    async fn insert(&self, new_user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            firstname: new_user.firstname,
            lastname: new_user.lastname,
            password_hash: new_user.password_hash,
            reset_token: None,
            reset_token_expire: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(user)
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        clear_reset: bool,
    ) -> StoreResult<User> {
        self.modify(id, |user| {
            user.password_hash = password_hash.to_string();
            if clear_reset {
                user.reset_token = None;
                user.reset_token_expire = None;
            }
        })
        .await
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<User> {
        self.modify(id, |user| {
            user.reset_token = Some(token.to_string());
            user.reset_token_expire = Some(expires_at);
        })
        .await
    }

    async fn set_names(&self, id: Uuid, firstname: &str, lastname: &str) -> StoreResult<User> {
        self.modify(id, |user| {
            user.firstname = firstname.to_string();
            user.lastname = lastname.to_string();
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            firstname: "Ann".into(),
            lastname: "Lee".into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        let first = store.insert(new_user("a@x.com")).await.expect("first insert");

        let err = store.insert(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        let found = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn reset_token_lookup_filters_expired() {
        let store = InMemoryUserStore::new();
        let user = store.insert(new_user("a@x.com")).await.unwrap();
        let now = OffsetDateTime::now_utc();

        store
            .set_reset_token(user.id, "tok", now - Duration::minutes(1))
            .await
            .unwrap();
        assert!(store.find_by_reset_token("tok", now).await.unwrap().is_none());

        store
            .set_reset_token(user.id, "tok", now + Duration::minutes(1))
            .await
            .unwrap();
        let found = store.find_by_reset_token("tok", now).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(store.find_by_reset_token("nope", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_to_unknown_user_fail() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@x.com")).await.unwrap();
        let missing = Uuid::new_v4();

        assert!(store.set_names(missing, "A", "B").await.is_err());
        assert!(store.set_password_hash(missing, "h", true).await.is_err());
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn field_writes_leave_other_columns_alone() {
        let store = InMemoryUserStore::new();
        let user = store.insert(new_user("a@x.com")).await.unwrap();
        let expires = OffsetDateTime::now_utc() + Duration::minutes(5);

        store.set_reset_token(user.id, "tok", expires).await.unwrap();
        let renamed = store.set_names(user.id, "Anna", "Ng").await.unwrap();
        assert_eq!(renamed.reset_token.as_deref(), Some("tok"));
        assert_eq!(renamed.password_hash, "hash");

        let kept = store.set_password_hash(user.id, "h2", false).await.unwrap();
        assert_eq!(kept.reset_token.as_deref(), Some("tok"));
        assert_eq!(kept.firstname, "Anna");

        let cleared = store.set_password_hash(user.id, "h3", true).await.unwrap();
        assert!(cleared.reset_token.is_none() && cleared.reset_token_expire.is_none());
        assert_eq!(cleared.email, "a@x.com");
        assert_eq!(store.writes(), 5);
    }
}
