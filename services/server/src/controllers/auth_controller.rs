use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use log::info;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::user_model::{UserRow, USER_COLUMNS};
use crate::types::auth_types::{LoginInput, RegisterInput, UpdateProfileInput, WalletProof};
use crate::utils::jwt::{create_jwt, extract_auth_user, TOKEN_TTL_HOURS};
use crate::utils::responses::{created, ok};

fn session(user: &UserRow, config: &AppConfig) -> Result<serde_json::Value, ApiError> {
    let auth_user = user.auth_user()?;
    let token = create_jwt(&auth_user, &config.jwt_secret)
        .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))?;

    Ok(json!({
        "token": token,
        "expires_in": TOKEN_TTL_HOURS * 3600,
        "user": user
    }))
}

/// bcrypt at the default cost takes long enough to stall a worker.
async fn hash_password(password: String) -> Result<String, ApiError> {
    web::block(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing was cancelled: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

async fn password_matches(password: String, stored: String) -> Result<bool, ApiError> {
    web::block(move || verify(password, &stored).unwrap_or(false))
        .await
        .map_err(|e| ApiError::Internal(format!("Password check was cancelled: {}", e)))
}

fn unique_violation(e: sqlx::Error, message: &str) -> ApiError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::Conflict(message.into()),
        _ => ApiError::Database(e),
    }
}

#[post("/register")]
pub async fn register(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: web::Json<RegisterInput>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let wallet = req.proven_wallet(Utc::now())?;

    let password_hash = hash_password(req.password.clone()).await?;

    let sql = format!(
        "INSERT INTO users (email, password_hash, wallet_address, last_login_at) \
         VALUES ($1, $2, $3, NOW()) RETURNING {}",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, UserRow>(&sql)
        .bind(req.email.to_lowercase())
        .bind(password_hash)
        .bind(wallet)
        .fetch_one(db_pool.get_ref())
        .await
        .map_err(|e| unique_violation(e, "Email or wallet is already registered"))?;

    info!("Registered user: user_id={}", user.id);
    Ok(created(session(&user, &config)?))
}

#[post("/login")]
pub async fn login(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: web::Json<LoginInput>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, UserRow>(&sql)
        .bind(req.email.to_lowercase())
        .fetch_optional(db_pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".into()))?;

    let password_ok = match user.password_hash.clone() {
        Some(stored) => password_matches(req.password.clone(), stored).await?,
        None => false,
    };
    if !password_ok {
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(db_pool.get_ref())
        .await?;

    Ok(ok(session(&user, &config)?))
}

#[post("/wallet-login")]
pub async fn wallet_login(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: web::Json<WalletProof>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let wallet_address = req.verify(Utc::now())?;

    let sql = format!(
        "INSERT INTO users (wallet_address, last_login_at) VALUES ($1, NOW()) \
         ON CONFLICT (wallet_address) DO UPDATE SET last_login_at = NOW() \
         RETURNING {}",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, UserRow>(&sql)
        .bind(wallet_address)
        .fetch_one(db_pool.get_ref())
        .await?;

    info!("Wallet login: user_id={}", user.id);
    Ok(ok(session(&user, &config)?))
}

#[get("/me")]
pub async fn get_me(
    db_pool: web::Data<PgPool>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let auth = extract_auth_user(&req)?;

    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, UserRow>(&sql)
        .bind(auth.user_id)
        .fetch_optional(db_pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(ok(user))
}

/// Returns a fresh token because the wallet is part of the claims.
#[put("/profile")]
pub async fn update_profile(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: HttpRequest,
    body: web::Json<UpdateProfileInput>,
) -> Result<HttpResponse, ApiError> {
    let auth = extract_auth_user(&req)?;
    body.validate()?;
    let wallet = body.proven_wallet(Utc::now())?;

    let sql = format!(
        "UPDATE users SET preferred_chain = COALESCE($2, preferred_chain), \
         wallet_address = COALESCE($3, wallet_address), updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, UserRow>(&sql)
        .bind(auth.user_id)
        .bind(&body.preferred_chain)
        .bind(wallet)
        .fetch_optional(db_pool.get_ref())
        .await
        .map_err(|e| unique_violation(e, "Wallet is already linked to another account"))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(ok(session(&user, &config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_password_hashing_off_the_worker() {
        let stored = hash_password("correct horse".to_string()).await.unwrap();
        assert_ne!(stored, "correct horse");

        assert!(password_matches("correct horse".into(), stored.clone()).await.unwrap());
        assert!(!password_matches("wrong horse".into(), stored).await.unwrap());
        assert!(!password_matches("correct horse".into(), "not-a-hash".into()).await.unwrap());
    }
}
