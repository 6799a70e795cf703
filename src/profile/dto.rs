use serde::{Deserialize, Serialize};

use crate::users::PublicUser;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// Response for a successful profile update.
#[derive(Debug, Serialize)]
pub struct ProfileUpdated {
    pub success: bool,
    pub message: String,
    pub data: PublicUser,
}
