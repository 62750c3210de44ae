use actix_web::{HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use settlement::UserRole;

use crate::errors::ApiError;
use crate::types::auth_types::AuthUser;

pub const TOKEN_TTL_HOURS: i64 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    role: String,
    wallet: Option<String>,
    iat: usize,
    exp: usize,
}

pub fn create_jwt(user: &AuthUser, secret: &str) -> Result<String, JwtError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.user_id,
        role: user.role.as_str().to_string(),
        wallet: user.wallet_address.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<AuthUser, JwtError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    let role: UserRole = data
        .claims
        .role
        .parse()
        .map_err(|_| JwtError::from(ErrorKind::InvalidToken))?;

    Ok(AuthUser {
        user_id: data.claims.sub,
        role,
        wallet_address: data.claims.wallet,
    })
}

/// The user `AuthMiddleware` attached to the request.
pub fn extract_auth_user(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
}
