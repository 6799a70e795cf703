use anyhow::{ensure, Context};
use serde::Deserialize;

const MAX_JWT_TTL_HOURS: i64 = 24 * 365;
const MAX_RESET_VALIDITY_MINUTES: i64 = 60 * 24 * 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "production" | "prod" => AppEnv::Production,
            "test" => AppEnv::Test,
            _ => AppEnv::Development,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

/// Argon2 cost parameters. `hash_cost` is the iteration count.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub hash_cost: u32,
    pub memory_kib: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
    /// Base URL used to build reset links; falls back to the request host.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub env: AppEnv,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub reset_validity_minutes: i64,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "passgate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "passgate-users".into()),
            ttl_hours: parse_var("JWT_TTL_HOURS").unwrap_or(72),
        };
        let password = PasswordConfig {
            hash_cost: parse_var("PASSWORD_HASH_COST").unwrap_or(argon2::Params::DEFAULT_T_COST),
            memory_kib: parse_var("PASSWORD_HASH_MEMORY_KIB")
                .unwrap_or(argon2::Params::DEFAULT_M_COST),
        };
        let mail = MailConfig {
            smtp_host: non_empty_var("SMTP_HOST"),
            smtp_port: parse_var("SMTP_PORT"),
            smtp_username: non_empty_var("SMTP_USERNAME"),
            smtp_password: non_empty_var("SMTP_PASSWORD"),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@passgate.local".into()),
            public_url: non_empty_var("PUBLIC_URL"),
        };

        let config = Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("APP_PORT").unwrap_or(8080),
            env: std::env::var("APP_ENV")
                .map(|v| AppEnv::parse(&v))
                .unwrap_or(AppEnv::Development),
            jwt,
            password,
            reset_validity_minutes: parse_var("RESET_PASSWORD_VALIDITY_MINUTES").unwrap_or(60),
            mail,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects durations that are non-positive or too large to add to a timestamp.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_JWT_TTL_HOURS).contains(&self.jwt.ttl_hours),
            "JWT_TTL_HOURS must be between 1 and {MAX_JWT_TTL_HOURS}, got {}",
            self.jwt.ttl_hours
        );
        ensure!(
            (1..=MAX_RESET_VALIDITY_MINUTES).contains(&self.reset_validity_minutes),
            "RESET_PASSWORD_VALIDITY_MINUTES must be between 1 and {MAX_RESET_VALIDITY_MINUTES}, got {}",
            self.reset_validity_minutes
        );
        Ok(())
    }

    /// Request logging is switched off for the test environment.
    pub fn request_logging(&self) -> bool {
        self.env != AppEnv::Test
    }

    pub fn reset_validity(&self) -> time::Duration {
        time::Duration::minutes(self.reset_validity_minutes)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::test_config;

    #[test]
    fn app_env_parsing_defaults_to_development() {
        assert_eq!(AppEnv::parse("test"), AppEnv::Test);
        assert_eq!(AppEnv::parse(" Production "), AppEnv::Production);
        assert_eq!(AppEnv::parse("prod"), AppEnv::Production);
        assert_eq!(AppEnv::parse("staging"), AppEnv::Development);
    }

    #[test]
    fn validate_accepts_defaults_and_bounds() {
        let mut config = test_config();
        assert!(config.validate().is_ok());

        config.jwt.ttl_hours = MAX_JWT_TTL_HOURS;
        config.reset_validity_minutes = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_durations() {
        for ttl in [0, -5, MAX_JWT_TTL_HOURS + 1, i64::MAX] {
            let mut config = test_config();
            config.jwt.ttl_hours = ttl;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("JWT_TTL_HOURS"));
        }

        for minutes in [0, -1, MAX_RESET_VALIDITY_MINUTES + 1, i64::MAX] {
            let mut config = test_config();
            config.reset_validity_minutes = minutes;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("RESET_PASSWORD_VALIDITY_MINUTES"));
        }
    }
}
