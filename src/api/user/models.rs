use serde::{Deserialize, Serialize};
use validator::Validate;

use super::tracker::RegistrationStatus;
use crate::api::validation::name_bytes;

/// Profile to create for the connected wallet
#[derive(Deserialize, Serialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    #[validate(custom(function = "name_bytes"))]
    pub name: String,

    #[serde(default)]
    pub is_client: bool,

    #[serde(default)]
    pub is_freelancer: bool,
}

/// Registration status as rendered to API clients
#[derive(Debug, Serialize)]
pub struct RegistrationView {
    #[serde(flatten)]
    pub status: RegistrationStatus,
    /// The lookup failed, so `unregistered` is not authoritative
    pub indeterminate: bool,
}

impl From<RegistrationStatus> for RegistrationView {
    fn from(status: RegistrationStatus) -> Self {
        let indeterminate = status.is_indeterminate();
        Self { status, indeterminate }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub message: String,
    pub signature: String,
    pub registration: RegistrationView,
}
