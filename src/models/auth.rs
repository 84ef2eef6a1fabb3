use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, Ready};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AuthRejection;

/// JWT payload. `UserID` and `LoginPlatform` keep the wire names existing
/// clients already carry in their tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub aud: String,
    #[serde(rename = "UserID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "LoginPlatform", default, skip_serializing_if = "Option::is_none")]
    pub login_platform: Option<String>,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub exp: i64,
}

/// The authenticated principal attached to a request once its token has
/// been verified. Both fields are guaranteed non-empty by verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub login_platform: String,
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Populated by the authentication gate; absent means the route was
        // registered outside it.
        let user = req.extensions().get::<CurrentUser>().cloned();
        ready(user.ok_or_else(|| AuthRejection::Unauthenticated.into()))
    }
}
