use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::auth::jwt::JwtKeys;
use crate::auth::password::PasswordHasher;
use crate::config::AppConfig;
use crate::mail::{self, Mailer};
use crate::users::{PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub hasher: PasswordHasher,
    pub keys: JwtKeys,
}

impl AppState {
    /// Connects to the database and wires the collaborators from `config`.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, PgPool)> {
        let config = Arc::new(config);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let mailer = mail::from_config(&config.mail)?;

        Ok((Self::from_parts(config, users, mailer)?, db))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(&config.password)?;
        let keys = JwtKeys::from(&config.jwt);
        Ok(Self {
            config,
            users,
            mailer,
            hasher,
            keys,
        })
    }
}
