use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::JwtOptions;
use crate::errors::{ServiceError, VerifyError};
use crate::models::auth::{Claims, CurrentUser};

/// Seconds of clock drift tolerated between issuing and verifying hosts.
const CLOCK_SKEW_SECS: i64 = 10;

/// Token lifetime used when the caller does not specify one.
pub const DEFAULT_TTL_MINUTES: u32 = 60;

/// Issues and verifies the service's bearer tokens.
pub struct TokenService {
    issuer: String,
    audience: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

struct VerifiedToken {
    user: CurrentUser,
    expires_at: DateTime<Utc>,
}

impl TokenService {
    pub fn new(options: &JwtOptions) -> Self {
        TokenService {
            issuer: options.issuer.clone(),
            audience: options.audience.clone(),
            encoding_key: EncodingKey::from_secret(options.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(options.secret.as_bytes()),
        }
    }

    /// Signs a token for `user`, valid for `ttl_minutes`.
    ///
    /// A zero TTL is a caller bug; it is clamped to one minute rather than
    /// producing an already-expired token.
    pub fn generate_token(
        &self,
        user: &CurrentUser,
        ttl_minutes: u32,
    ) -> Result<String, ServiceError> {
        self.generate_token_at(user, ttl_minutes, Utc::now())
    }

    fn generate_token_at(
        &self,
        user: &CurrentUser,
        ttl_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let ttl = i64::from(ttl_minutes.max(1));
        let claims = Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            user_id: Some(user.user_id.to_string()),
            login_platform: Some(user.login_platform.clone()),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ttl)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verifies `token` and returns the identity it carries.
    pub fn verify_token(&self, token: &str) -> Result<CurrentUser, VerifyError> {
        self.verify_token_at(token, Utc::now())
    }

    fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<CurrentUser, VerifyError> {
        self.check_token_at(token, now).map(|v| v.user)
    }

    /// Runs the verification pipeline but projects the expiry instant, for
    /// callers that only need to report when a token lapses.
    pub fn get_expiry(&self, token: &str) -> Result<DateTime<Utc>, VerifyError> {
        self.get_expiry_at(token, Utc::now())
    }

    fn get_expiry_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, VerifyError> {
        self.check_token_at(token, now).map(|v| v.expires_at)
    }

    /// The verification pipeline. Checks run in a fixed order and stop at
    /// the first failure: structure, signature, issuer/audience, expiry,
    /// identity claims.
    fn check_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, VerifyError> {
        let claims = self.decode_signed(token)?;

        if claims.iss != self.issuer || claims.aud != self.audience {
            return Err(VerifyError::IssuerAudienceMismatch);
        }

        if now.timestamp() > claims.exp + CLOCK_SKEW_SECS {
            return Err(VerifyError::Expired);
        }
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(VerifyError::Malformed)?;

        // Either identity claim missing, empty, or unparseable makes the
        // token unusable, never a degraded success.
        let user_id = claims
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(VerifyError::MissingClaims)?;
        let login_platform = claims
            .login_platform
            .filter(|p| !p.is_empty())
            .ok_or(VerifyError::MissingClaims)?;

        Ok(VerifiedToken {
            user: CurrentUser {
                user_id,
                login_platform,
            },
            expires_at,
        })
    }

    /// Parses the three-part structure and checks the signature. Temporal
    /// and audience checks run in `check_token_at`, where their order and
    /// error mapping are explicit.
    fn decode_signed(&self, token: &str) -> Result<Claims, VerifyError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => VerifyError::BadSignature,
                _ => VerifyError::Malformed,
            })
    }
}
