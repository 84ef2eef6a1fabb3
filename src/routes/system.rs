use crate::errors::{AuthRejection, ServiceError};
use crate::middleware::auth_gate::AuthenticationGate;
use crate::models::auth::CurrentUser;
use crate::models::requests::TokenRequest;
use crate::models::responses::{ApiResponse, JwtTokenData, ServerTimeData, TokenExpiryData};
use crate::routes::AppState;
use crate::services::token_service::DEFAULT_TTL_MINUTES;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Local};
use serde_json::json;
use validator::Validate;

pub fn init_routes(cfg: &mut web::ServiceConfig, auth_gate: AuthenticationGate) {
    cfg.service(
        web::scope("/system_info")
            .route("/wellcome", web::get().to(wellcome))
            .route("/get_jwt", web::get().to(get_jwt))
            .route("/token_expiry", web::get().to(token_expiry))
            .service(
                web::scope("")
                    .wrap(auth_gate)
                    .route("/server_time", web::get().to(server_time))
                    .route("/server_time2", web::post().to(server_time))
                    .route("/current_user", web::get().to(current_user)),
            ),
    );
}

/// Welcome message, open to unauthenticated callers
/// GET /api/v1/system/system_info/wellcome
async fn wellcome() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::with_message(
        "Hello! Welcome to Sinno-MCM.",
        json!({}),
    ))
}

/// Issues a signed bearer token for the given identity
/// GET /api/v1/system/system_info/get_jwt
async fn get_jwt(
    state: web::Data<AppState>,
    query: web::Query<TokenRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let req = query.into_inner();
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let user = CurrentUser {
        user_id: req.user_id,
        login_platform: req.login_platform,
    };
    let ttl = req.ttl_minutes.unwrap_or(DEFAULT_TTL_MINUTES);

    let token = state.token_service.generate_token(&user, ttl).map_err(|e| {
        log::error!("Failed to issue token for {}: {}", user.user_id, e);
        e
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(JwtTokenData {
        jwt_token: format!("Bearer {}", token),
    })))
}

/// Reports when the presented bearer token expires
/// GET /api/v1/system/system_info/token_expiry
async fn token_expiry(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, actix_web::Error> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthRejection::Unauthenticated)?;

    let expires_at = state.token_service.get_expiry(token).map_err(|e| {
        log::debug!("token_expiry rejected token: {}", e);
        AuthRejection::Unauthenticated
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(TokenExpiryData {
        expires_at: format_timestamp(expires_at.with_timezone(&Local)),
        expires_at_timestamp: expires_at.timestamp(),
    })))
}

/// Current server time; sits behind the authentication gate
/// GET /api/v1/system/system_info/server_time
/// POST /api/v1/system/system_info/server_time2
async fn server_time() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(ServerTimeData {
        server_time: format_timestamp(Local::now()),
    }))
}

/// Echoes the identity carried by the verified token
/// GET /api/v1/system/system_info/current_user
async fn current_user(user: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(user))
}

/// Timestamp wire format: `2024-01-02 15:04:05.123`.
fn format_timestamp(ts: DateTime<Local>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}
