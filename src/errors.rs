use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

/// Possible errors that can occur in the service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl actix_web::error::ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.status_code().to_string(),
            message: self.to_string(),
        })
    }
}

/// Error response for API endpoints
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    message: String,
}

/// Why token verification failed. Callers only ever see a 401; the
/// distinction exists for logs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("issuer or audience mismatch")]
    IssuerAudienceMismatch,
    #[error("token expired")]
    Expired,
    #[error("missing identity claims")]
    MissingClaims,
}

/// Terminal authentication outcomes, rendered with the fixed wire shape
/// clients depend on.
#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("authentication failed")]
    Unauthenticated,
    #[error("forbidden: insufficient privilege")]
    Forbidden,
}

impl actix_web::error::ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthRejection::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthRejection::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(RejectionBody {
            code: self.status_code().as_u16(),
            msg: self.to_string(),
        })
    }
}

#[derive(Serialize)]
struct RejectionBody {
    code: u16,
    msg: String,
}
