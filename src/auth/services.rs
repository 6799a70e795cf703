use axum::extract::FromRef;
use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{
            present, present_trimmed, ForgotPasswordRequest, ResetPasswordRequest, SigninRequest,
            SignupRequest, UpdatePasswordRequest,
        },
        jwt::JwtKeys,
    },
    error::{AppError, AppResult},
    mail::ResetPasswordEmail,
    state::AppState,
    users::{NewUser, StoreError, User},
};

const RESET_TOKEN_BYTES: usize = 48;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks the credentials and returns a signed session token.
pub async fn signin(state: &AppState, req: SigninRequest) -> AppResult<String> {
    let (Some(email), Some(password)) = (present_trimmed(req.email), present(req.password)) else {
        return Err(AppError::Validation("Please provide an email and a password"));
    };
    let email = normalize_email(&email);

    let user = state
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| AppError::dependency("Unable to sign in", e))?
        .ok_or_else(|| {
            warn!(email = %email, "signin unknown email");
            AppError::NotFound("No user exists for these credentials")
        })?;

    let ok = state
        .hasher
        .verify_async(password, user.password_hash.clone())
        .await
        .map_err(|e| AppError::dependency("Unable to sign in", e))?;
    if !ok {
        warn!(user_id = %user.id, "signin invalid password");
        return Err(AppError::Auth("Wrong password"));
    }

    let token = JwtKeys::from_ref(state)
        .sign(user.id)
        .map_err(|e| AppError::dependency("Unable to sign in", e))?;

    info!(user_id = %user.id, "user signed in");
    Ok(token)
}

/// Registers a new account. No token is issued.
pub async fn signup(state: &AppState, req: SignupRequest) -> AppResult<()> {
    let (Some(email), Some(password), Some(firstname), Some(lastname)) = (
        present_trimmed(req.email),
        present(req.password),
        present_trimmed(req.firstname),
        present_trimmed(req.lastname),
    ) else {
        return Err(AppError::Validation("Please fill in all required fields"));
    };
    let email = normalize_email(&email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email address"));
    }

    let existing = state
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| AppError::dependency("Unable to create the account", e))?;
    if existing.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("A user already exists for this email"));
    }

    let password_hash = state
        .hasher
        .hash_async(password)
        .await
        .map_err(|e| AppError::dependency("Unable to create the account", e))?;

    let new_user = NewUser {
        email,
        firstname,
        lastname,
        password_hash,
    };
    // A concurrent sign-up can still win between the lookup and the insert.
    let user = state.users.insert(new_user).await.map_err(|e| match e {
        StoreError::DuplicateEmail => AppError::Conflict("A user already exists for this email"),
        other => AppError::dependency("Unable to create the account", other),
    })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(())
}

/// Changes the password of the already authenticated `user`.
pub async fn update_password(
    state: &AppState,
    user: User,
    req: UpdatePasswordRequest,
) -> AppResult<()> {
    let (Some(current), Some(new_password), Some(confirm)) = (
        present(req.password),
        present(req.new_password),
        present(req.new_confirm_password),
    ) else {
        return Err(AppError::Validation("Please fill in all required fields"));
    };

    let ok = state
        .hasher
        .verify_async(current, user.password_hash.clone())
        .await
        .map_err(|e| AppError::dependency("Unable to update the password", e))?;
    if !ok {
        warn!(user_id = %user.id, "update_password wrong current password");
        return Err(AppError::Auth(
            "The password does not match the current password",
        ));
    }

    if new_password != confirm {
        return Err(AppError::Validation("The two passwords are not identical"));
    }

    let password_hash = state
        .hasher
        .hash_async(new_password)
        .await
        .map_err(|e| AppError::dependency("Unable to update the password", e))?;
    state
        .users
        .set_password_hash(user.id, &password_hash, false)
        .await
        .map_err(|e| AppError::dependency("Unable to update the password", e))?;

    info!(user_id = %user.id, "password updated");
    Ok(())
}

/// Stores a fresh reset token on the user and emails it.
///
/// `host` is the request's `Host` header, used for the link when no
/// public URL is configured.
pub async fn forgot_password(
    state: &AppState,
    req: ForgotPasswordRequest,
    host: Option<&str>,
) -> AppResult<()> {
    let Some(email) = present_trimmed(req.email) else {
        return Err(AppError::Validation("Please provide an email"));
    };
    let email = normalize_email(&email);

    let user = state
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| AppError::dependency("Unable to retrieve the user", e))?
        .ok_or_else(|| {
            warn!(email = %email, "forgot_password unknown email");
            AppError::NotFound("No account found for this email")
        })?;

    let token = generate_reset_token().map_err(|e| AppError::dependency("An error occurred", e))?;
    let expires_at = OffsetDateTime::now_utc() + state.config.reset_validity();

    let user = state
        .users
        .set_reset_token(user.id, &token, expires_at)
        .await
        .map_err(|e| AppError::dependency("Unable to update the user", e))?;

    let message = ResetPasswordEmail {
        to_email: user.email.clone(),
        firstname: user.firstname.clone(),
        lastname: user.lastname.clone(),
        reset_link: reset_link(state, host, &token),
        token,
    };
    state
        .mailer
        .send_reset_password(&message)
        .await
        .map_err(AppError::Mail)?;

    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

/// Sets a new password for the holder of a valid reset token.
pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> AppResult<()> {
    let (Some(token), Some(password), Some(confirm)) = (
        present_trimmed(req.token),
        present(req.password),
        present(req.confirm_password),
    ) else {
        return Err(AppError::Validation("Please provide the new password"));
    };

    if password != confirm {
        return Err(AppError::Validation("Both passwords must be identical"));
    }

    // Unknown and expired tokens share one error.
    let user = state
        .users
        .find_by_reset_token(&token, OffsetDateTime::now_utc())
        .await
        .map_err(|e| AppError::dependency("Unable to retrieve the user", e))?
        .ok_or_else(|| {
            warn!("reset_password with unknown or expired token");
            AppError::InvalidResetToken
        })?;

    let password_hash = state
        .hasher
        .hash_async(password)
        .await
        .map_err(|e| AppError::dependency("Unable to reset the password", e))?;

    state
        .users
        .set_password_hash(user.id, &password_hash, true)
        .await
        .map_err(|e| AppError::dependency("Error while updating the password", e))?;

    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// 48 bytes from the OS RNG, hex-encoded.
fn generate_reset_token() -> anyhow::Result<String> {
    let mut buf = [0u8; RESET_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut buf).map_err(|e| {
        error!(error = %e, "os rng failure");
        anyhow::anyhow!(e)
    })?;
    Ok(hex::encode(buf))
}

fn reset_link(state: &AppState, host: Option<&str>, token: &str) -> String {
    let base = match (&state.config.mail.public_url, host) {
        (Some(url), _) => url.trim_end_matches('/').to_string(),
        (None, Some(host)) => format!("http://{host}"),
        (None, None) => format!("http://localhost:{}", state.config.port),
    };
    format!("{base}/reset-password/{token}")
}
