use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::errors::ApiError;

/// How far a wallet-login timestamp may drift from the server clock.
pub const LOGIN_MAX_SKEW_SECS: i64 = 300;

/// Solana addresses are base58-encoded 32-byte ed25519 public keys.
pub fn decode_address(address: &str) -> Result<[u8; 32], ApiError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|_| ApiError::BadRequest("Wallet address is not valid base58".into()))?;

    bytes
        .try_into()
        .map_err(|_| ApiError::BadRequest("Wallet address must be 32 bytes".into()))
}

pub fn is_valid_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

pub fn wallet_login_message(wallet_address: &str, timestamp: i64) -> String {
    format!(
        "Sign in to Jackpot Pool\nWallet: {}\nTimestamp: {}",
        wallet_address, timestamp
    )
}

pub fn check_login_timestamp(timestamp: i64, now: DateTime<Utc>) -> Result<(), ApiError> {
    now.timestamp()
        .checked_sub(timestamp)
        .and_then(i64::checked_abs)
        .filter(|skew| *skew <= LOGIN_MAX_SKEW_SECS)
        .map(|_| ())
        .ok_or_else(|| ApiError::Unauthorized("Login message has expired".into()))
}

pub fn verify_wallet_signature(
    wallet_address: &str,
    message: &str,
    signature: &str,
) -> Result<(), ApiError> {
    let key_bytes = decode_address(wallet_address)?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| ApiError::BadRequest("Wallet address is not an ed25519 key".into()))?;

    let sig_bytes = bs58::decode(signature)
        .into_vec()
        .map_err(|_| ApiError::BadRequest("Signature is not valid base58".into()))?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|_| ApiError::BadRequest("Signature must be 64 bytes".into()))?;

    key.verify(message.as_bytes(), &signature)
        .map_err(|_| ApiError::Unauthorized("Invalid wallet signature".into()))
}

/// Proves the caller holds the wallet's key: a fresh login message signed
/// by it. Required wherever a wallet gets attached to an account.
pub fn prove_wallet_ownership(
    wallet_address: &str,
    timestamp: i64,
    signature: &str,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    check_login_timestamp(timestamp, now)?;
    let message = wallet_login_message(wallet_address, timestamp);
    verify_wallet_signature(wallet_address, &message, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair() -> (SigningKey, String) {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let address = bs58::encode(signing.verifying_key().to_bytes()).into_string();
        (signing, address)
    }

    #[test]
    fn test_valid_signature() {
        let (signing, address) = keypair();
        let message = wallet_login_message(&address, 1_700_000_000);
        let signature = bs58::encode(signing.sign(message.as_bytes()).to_bytes()).into_string();

        assert!(verify_wallet_signature(&address, &message, &signature).is_ok());
    }

    #[test]
    fn test_signature_over_other_message() {
        let (signing, address) = keypair();
        let signed = wallet_login_message(&address, 1_700_000_000);
        let signature = bs58::encode(signing.sign(signed.as_bytes()).to_bytes()).into_string();

        let other = wallet_login_message(&address, 1_700_000_001);
        let err = verify_wallet_signature(&address, &other, &signature).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_address_validation() {
        let (_, address) = keypair();
        assert!(is_valid_address(&address));
        assert!(!is_valid_address("not-base58-0OIl"));
        assert!(!is_valid_address("3yZe7d"));
    }

    #[test]
    fn test_login_timestamp_window() {
        let now = Utc::now();
        assert!(check_login_timestamp(now.timestamp(), now).is_ok());
        assert!(check_login_timestamp((now - Duration::seconds(299)).timestamp(), now).is_ok());
        assert!(check_login_timestamp((now - Duration::minutes(10)).timestamp(), now).is_err());
        assert!(check_login_timestamp(i64::MIN, now).is_err());
        assert!(check_login_timestamp(i64::MAX, now).is_err());
    }

    #[test]
    fn test_wallet_ownership_proof() {
        let (signing, address) = keypair();
        let now = Utc::now();
        let message = wallet_login_message(&address, now.timestamp());
        let signature = bs58::encode(signing.sign(message.as_bytes()).to_bytes()).into_string();

        assert!(prove_wallet_ownership(&address, now.timestamp(), &signature, now).is_ok());

        let stale = now + Duration::minutes(10);
        assert!(prove_wallet_ownership(&address, now.timestamp(), &signature, stale).is_err());

        let other = SigningKey::from_bytes(&[9u8; 32]);
        let other = bs58::encode(other.verifying_key().to_bytes()).into_string();
        let err = prove_wallet_ownership(&other, now.timestamp(), &signature, now).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
