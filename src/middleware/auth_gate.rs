use crate::errors::AuthRejection;
use crate::models::auth::CurrentUser;
use crate::services::token_service::TokenService;
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error as ActixError, HttpMessage,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::sync::Arc;
use std::task::{Context, Poll};

/// Hook for a future authorization layer. Authentication proves who the
/// caller is; this decides what they may do.
pub trait AuthorizePolicy: Send + Sync {
    fn authorize(&self, user: &CurrentUser) -> bool;
}

/// Policy used until a real role system exists: every authenticated
/// caller is allowed through.
pub struct AllowAll;

impl AuthorizePolicy for AllowAll {
    fn authorize(&self, _user: &CurrentUser) -> bool {
        true
    }
}

/// Bearer-token authentication middleware initializer.
#[derive(Clone)]
pub struct AuthenticationGate {
    token_service: Arc<TokenService>,
    policy: Arc<dyn AuthorizePolicy>,
}

impl AuthenticationGate {
    pub fn new(token_service: Arc<TokenService>) -> Self {
        Self::with_policy(token_service, Arc::new(AllowAll))
    }

    pub fn with_policy(
        token_service: Arc<TokenService>,
        policy: Arc<dyn AuthorizePolicy>,
    ) -> Self {
        AuthenticationGate {
            token_service,
            policy,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = AuthenticationGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthenticationGateMiddleware {
            service,
            token_service: self.token_service.clone(),
            policy: self.policy.clone(),
        })
    }
}

/// Per-request decision: authenticated identity, 401 challenge, or 403.
pub struct AuthenticationGateMiddleware<S> {
    service: S,
    token_service: Arc<TokenService>,
    policy: Arc<dyn AuthorizePolicy>,
}

impl<S> AuthenticationGateMiddleware<S> {
    /// The decision procedure, separated from the actix plumbing: extract
    /// the bearer token, verify it, apply the authorization policy.
    fn authenticate(&self, req: &ServiceRequest) -> Result<CurrentUser, AuthRejection> {
        // A missing or non-bearer header never reaches the codec.
        let token = bearer_token(req).ok_or(AuthRejection::Unauthenticated)?;

        let user = self.token_service.verify_token(token).map_err(|e| {
            log::debug!("rejected bearer token: {}", e);
            AuthRejection::Unauthenticated
        })?;

        if !self.policy.authorize(&user) {
            return Err(AuthRejection::Forbidden);
        }

        Ok(user)
    }
}

impl<S, B> Service<ServiceRequest> for AuthenticationGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.authenticate(&req) {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await })
            }
            Err(rejection) => Box::pin(async move { Err(rejection.into()) }),
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtOptions;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use uuid::Uuid;

    const CHALLENGE_BODY: &str = r#"{"code":401,"msg":"authentication failed"}"#;
    const FORBIDDEN_BODY: &str = r#"{"code":403,"msg":"forbidden: insufficient privilege"}"#;

    struct DenyAll;

    impl AuthorizePolicy for DenyAll {
        fn authorize(&self, _user: &CurrentUser) -> bool {
            false
        }
    }

    fn token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(&JwtOptions {
            issuer: "Enrich".to_string(),
            audience: "Client".to_string(),
            secret: "0123456789abcdef0123456789abcdef".to_string(),
        }))
    }

    fn test_user() -> CurrentUser {
        CurrentUser {
            user_id: Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap(),
            login_platform: "PC".to_string(),
        }
    }

    async fn whoami(user: CurrentUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    /// Renders a gate rejection the way the server would.
    async fn rejection_response(
        err: ActixError,
    ) -> (StatusCode, Option<String>, actix_web::web::Bytes) {
        let resp = err.error_response();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        (status, content_type, body)
    }

    #[actix_web::test]
    async fn missing_header_yields_challenge() {
        let app = test::init_service(
            App::new().service(
                web::scope("/secure")
                    .wrap(AuthenticationGate::new(token_service()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/secure/whoami").to_request();
        let err = app.call(req).await.expect_err("gate should reject");

        let (status, content_type, body) = rejection_response(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, CHALLENGE_BODY.as_bytes());
    }

    #[actix_web::test]
    async fn non_bearer_header_yields_challenge() {
        let app = test::init_service(
            App::new().service(
                web::scope("/secure")
                    .wrap(AuthenticationGate::new(token_service()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/secure/whoami")
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_request();
        let err = app.call(req).await.expect_err("gate should reject");

        let (status, _, body) = rejection_response(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, CHALLENGE_BODY.as_bytes());
    }

    #[actix_web::test]
    async fn garbage_token_yields_challenge() {
        let app = test::init_service(
            App::new().service(
                web::scope("/secure")
                    .wrap(AuthenticationGate::new(token_service()))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/secure/whoami")
            .insert_header((header::AUTHORIZATION, "Bearer not.a.token"))
            .to_request();
        let err = app.call(req).await.expect_err("gate should reject");

        let (status, _, body) = rejection_response(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, CHALLENGE_BODY.as_bytes());
    }

    #[actix_web::test]
    async fn valid_token_reaches_handler_with_identity() {
        let svc = token_service();
        let token = svc.generate_token(&test_user(), 5).unwrap();

        let app = test::init_service(
            App::new().service(
                web::scope("/secure")
                    .wrap(AuthenticationGate::new(svc))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/secure/whoami")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(body, "11111111-1111-1111-1111-111111111111".as_bytes());
    }

    #[actix_web::test]
    async fn denied_identity_yields_forbidden() {
        let svc = token_service();
        let token = svc.generate_token(&test_user(), 5).unwrap();

        let app = test::init_service(
            App::new().service(
                web::scope("/secure")
                    .wrap(AuthenticationGate::with_policy(svc, Arc::new(DenyAll)))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/secure/whoami")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let err = app.call(req).await.expect_err("policy should deny");

        let (status, content_type, body) = rejection_response(err).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, FORBIDDEN_BODY.as_bytes());
    }

    #[actix_web::test]
    async fn extractor_outside_gate_yields_challenge() {
        let app = test::init_service(
            App::new().route("/open/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/open/whoami").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
