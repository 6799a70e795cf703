use serde::{Deserialize, Serialize};

/// Request body for sign-in.
#[derive(Debug, Default, Deserialize)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for sign-up.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// Request body for changing the password of the signed-in user.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub password: Option<String>,
    pub new_password: Option<String>,
    pub new_confirm_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Response returned after a successful sign-in.
#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}

/// Empty strings count as missing, like absent fields.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Same as `present` but ignores surrounding whitespace.
pub(crate) fn present_trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
