use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: Option<String>,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub treasury_wallet: String,
    pub solana_rpc_url: String,
    pub admin_wallets: Vec<String>,
    pub resolution_fee_bps: u32,
    pub claim_delay_secs: i64,
    pub payment_verify_attempts: u32,
    pub payment_verify_delay: Duration,
    pub auto_lock_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key lookup so tests don't touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let resolution_fee_bps = parse_or(&lookup, "RESOLUTION_FEE_BPS", 0u32)?;
        if resolution_fee_bps > settlement::BPS_DENOMINATOR {
            return Err(ConfigError::Invalid {
                name: "RESOLUTION_FEE_BPS",
                value: resolution_fee_bps.to_string(),
            });
        }

        let payment_verify_attempts = parse_or(&lookup, "PAYMENT_VERIFY_ATTEMPTS", 5u32)?.max(1);

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?,
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            treasury_wallet: required("TREASURY_WALLET")?,
            solana_rpc_url: lookup("SOLANA_RPC_URL")
                .unwrap_or_else(|| "https://api.mainnet-beta.solana.com".to_string()),
            admin_wallets: parse_list(lookup("ADMIN_WALLETS")),
            resolution_fee_bps,
            claim_delay_secs: parse_or(&lookup, "CLAIM_DELAY_SECS", 0i64)?.max(0),
            payment_verify_attempts,
            payment_verify_delay: Duration::from_millis(parse_or(
                &lookup,
                "PAYMENT_VERIFY_DELAY_MS",
                2000u64,
            )?),
            auto_lock_interval: Duration::from_secs(
                parse_or(&lookup, "AUTO_LOCK_INTERVAL_SECS", 30u64)?.max(1),
            ),
        })
    }

    pub fn is_admin_wallet(&self, wallet: &str) -> bool {
        self.admin_wallets.iter().any(|w| w == wallet)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/jackpot"),
        ("JWT_SECRET", "secret"),
        ("TREASURY_WALLET", "Treasury111"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&BASE)).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.resolution_fee_bps, 0);
        assert_eq!(config.claim_delay_secs, 0);
        assert_eq!(config.payment_verify_attempts, 5);
        assert_eq!(config.payment_verify_delay, Duration::from_millis(2000));
        assert!(config.redis_url.is_none());
        assert!(config.admin_wallets.is_empty());
    }

    #[test]
    fn test_missing_required() {
        let err = AppConfig::from_lookup(lookup_from(&BASE[..2])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TREASURY_WALLET"));
    }

    #[test]
    fn test_admin_wallet_list() {
        let mut pairs = BASE.to_vec();
        pairs.push(("ADMIN_WALLETS", " WalletA, ,WalletB "));
        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.admin_wallets, vec!["WalletA", "WalletB"]);
        assert!(config.is_admin_wallet("WalletB"));
        assert!(!config.is_admin_wallet("WalletC"));
    }

    #[test]
    fn test_invalid_numbers() {
        let mut pairs = BASE.to_vec();
        pairs.push(("RESOLUTION_FEE_BPS", "20000"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::Invalid { name: "RESOLUTION_FEE_BPS", .. })
        ));

        let mut pairs = BASE.to_vec();
        pairs.push(("CLAIM_DELAY_SECS", "soon"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::Invalid { name: "CLAIM_DELAY_SECS", .. })
        ));
    }
}
