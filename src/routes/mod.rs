use crate::middleware::auth_gate::AuthenticationGate;
use crate::services::token_service::TokenService;
use actix_web::web;
use std::sync::Arc;

pub mod system;

#[derive(Clone)]
pub struct AppState {
    pub token_service: Arc<TokenService>,
}

pub fn init_routes(cfg: &mut web::ServiceConfig, auth_gate: AuthenticationGate) {
    cfg.service(
        web::scope("/api/v1/system").configure(|cfg| system::init_routes(cfg, auth_gate)),
    );
}
