use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::user;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// JWT claims embedded in both access and refresh tokens.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User ID as a UUID string.
    pub user_id: String,
    /// Email at the time the token was issued.
    pub email: String,
    /// User role: `"user"` or `"admin"`.
    pub role: String,
    /// Token type: `"access"` or `"refresh"`.
    pub token_type: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued-at time (Unix timestamp).
    pub iat: i64,
    /// Unique JWT identifier (refresh tokens are tracked by it in the database).
    pub jti: String,
}

impl Claims {
    /// Parse the `userId` claim.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim is not a UUID.
    pub fn user_uuid(&self) -> anyhow::Result<Uuid> {
        self.user_id
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid userId claim: {e}"))
    }
}

/// A pair of access and refresh tokens returned on register/login/refresh.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// The `jti` of the refresh token, used as its identifier in the database.
    pub refresh_jti: Uuid,
    /// Expiration of the refresh token.
    pub refresh_expires_at: chrono::DateTime<Utc>,
}

/// Generate a new access + refresh token pair for the given user.
///
/// # Errors
///
/// Returns an error if JWT encoding fails.
pub fn generate_token_pair(user: &user::Model, config: &Config) -> anyhow::Result<TokenPair> {
    let now = Utc::now();
    let refresh_jti = Uuid::new_v4();

    #[allow(clippy::cast_possible_wrap)]
    let access_exp = now.timestamp() + config.jwt_access_expiration_secs as i64;
    #[allow(clippy::cast_possible_wrap)]
    let refresh_exp = now.timestamp() + config.jwt_refresh_expiration_secs as i64;

    let claims = |token_type: &str, exp: i64, jti: Uuid| Claims {
        user_id: user.id.to_string(),
        email: user.email.clone(),
        role: user.role.clone(),
        token_type: token_type.to_string(),
        exp,
        iat: now.timestamp(),
        jti: jti.to_string(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());

    let access_token = encode(
        &Header::default(),
        &claims(ACCESS, access_exp, Uuid::new_v4()),
        &key,
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode access token: {e}"))?;

    let refresh_token = encode(
        &Header::default(),
        &claims(REFRESH, refresh_exp, refresh_jti),
        &key,
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {e}"))?;

    let refresh_expires_at =
        chrono::DateTime::from_timestamp(refresh_exp, 0).unwrap_or_else(Utc::now);

    Ok(TokenPair {
        access_token,
        refresh_token,
        refresh_jti,
        refresh_expires_at,
    })
}

/// Validate an access token and return its claims.
///
/// # Errors
///
/// Returns an error if the token is invalid, expired, or not an access token.
pub fn validate_access_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    validate(token, secret, ACCESS)
}

/// Validate a refresh token and return its claims.
///
/// # Errors
///
/// Returns an error if the token is invalid, expired, or not a refresh token.
pub fn validate_refresh_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    validate(token, secret, REFRESH)
}

fn validate(token: &str, secret: &str, expected_type: &str) -> anyhow::Result<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| anyhow::anyhow!("Invalid {expected_type} token: {e}"))?;

    if token_data.claims.token_type != expected_type {
        return Err(anyhow::anyhow!("Token is not an {expected_type} token"));
    }

    Ok(token_data.claims)
}
