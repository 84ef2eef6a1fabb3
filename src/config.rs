use std::env;

const DEFAULT_ISSUER: &str = "Enrich";
const DEFAULT_AUDIENCE: &str = "Client";

/// Built-in signing secret used when JWT_SECRET is absent. Anyone with the
/// source can forge tokens for a deployment running on this value.
const FALLBACK_SIGNING_SECRET: &str =
    "ASJStaticXgr8Bao8Ae8vs9y4gryNiWM8RC305i8yvUYCgRI7rHa7xJZqa9bzYFwog5x1iQ7l3L0YxaYSc4GluYT";

/// Minimum recommended secret length for HMAC-SHA256.
const MIN_SECRET_BYTES: usize = 32;

/// Token signing configuration, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct JwtOptions {
    pub issuer: String,
    pub audience: String,
    pub secret: String,
}

impl JwtOptions {
    fn from_env() -> Self {
        let secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                log::warn!(
                    "JWT_SECRET is not set; falling back to the built-in signing secret. \
                     Tokens signed with it can be forged by anyone with the source."
                );
                FALLBACK_SIGNING_SECRET.to_string()
            }
        };

        if secret.len() < MIN_SECRET_BYTES {
            log::warn!(
                "JWT_SECRET is {} bytes; HMAC-SHA256 secrets should be at least {} bytes",
                secret.len(),
                MIN_SECRET_BYTES
            );
        }

        JwtOptions {
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string()),
            secret,
        }
    }
}

/// Configuration settings
pub struct Config {
    pub bind_address: String,
    pub jwt: JwtOptions,
}

impl Config {
    /// Loads configuration from environment variables
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Config {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8081".to_string()),
            jwt: JwtOptions::from_env(),
        }
    }
}
