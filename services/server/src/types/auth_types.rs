use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use settlement::UserRole;
use validator::Validate;

use super::validate_wallet_address;
use crate::errors::ApiError;
use crate::utils::wallet::prove_wallet_ownership;

/// Identity attached to a request by `AuthMiddleware`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: UserRole,
    pub wallet_address: Option<String>,
}

/// A wallet plus a signed login message proving the caller holds its key.
/// Body of `POST /auth/wallet-login`, and the only way to attach a wallet
/// on register or profile update.
#[derive(Deserialize, Validate, Debug, Clone)]
pub struct WalletProof {
    #[validate(custom = "validate_wallet_address")]
    pub wallet_address: String,

    /// Unix seconds embedded in the signed login message.
    pub timestamp: i64,

    /// Base58 ed25519 signature of the login message.
    #[validate(length(min = 64, message = "Signature is required"))]
    pub signature: String,
}

impl WalletProof {
    pub fn verify(&self, now: DateTime<Utc>) -> Result<&str, ApiError> {
        prove_wallet_ownership(&self.wallet_address, self.timestamp, &self.signature, now)?;
        Ok(&self.wallet_address)
    }
}

fn proven_wallet(
    wallet: &Option<WalletProof>,
    now: DateTime<Utc>,
) -> Result<Option<&str>, ApiError> {
    wallet.as_ref().map(|proof| proof.verify(now)).transpose()
}

#[derive(Deserialize, Validate, Debug)]
#[serde(deny_unknown_fields)]
pub struct RegisterInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be atleast 8 characters"))]
    pub password: String,

    #[validate]
    pub wallet: Option<WalletProof>,
}

impl RegisterInput {
    pub fn proven_wallet(&self, now: DateTime<Utc>) -> Result<Option<&str>, ApiError> {
        proven_wallet(&self.wallet, now)
    }
}

#[derive(Deserialize, Validate, Debug)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be atleast 8 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileInput {
    #[validate(length(min = 2, max = 32, message = "Invalid chain name"))]
    pub preferred_chain: Option<String>,

    #[validate]
    pub wallet: Option<WalletProof>,
}

impl UpdateProfileInput {
    pub fn proven_wallet(&self, now: DateTime<Utc>) -> Result<Option<&str>, ApiError> {
        proven_wallet(&self.wallet, now)
    }
}
