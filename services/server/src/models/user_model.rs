use chrono::{DateTime, Utc};
use serde::Serialize;
use settlement::{SettlementError, UserRole};
use sqlx::FromRow;

use crate::types::auth_types::AuthUser;

pub const USER_COLUMNS: &str = "id, email, password_hash, wallet_address, role, preferred_chain, \
    last_login_at, created_at";

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub wallet_address: Option<String>,
    pub role: String,
    pub preferred_chain: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn auth_user(&self) -> Result<AuthUser, SettlementError> {
        Ok(AuthUser {
            user_id: self.id,
            role: self.role.parse::<UserRole>()?,
            wallet_address: self.wallet_address.clone(),
        })
    }
}
