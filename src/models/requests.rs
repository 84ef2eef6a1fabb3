use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Query parameters for token issuance
#[derive(Debug, Validate, Deserialize)]
pub struct TokenRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub login_platform: String,
    /// Token lifetime in minutes; defaults to 60 when omitted.
    pub ttl_minutes: Option<u32>,
}
