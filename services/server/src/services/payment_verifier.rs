use std::time::Duration;

use log::{info, warn};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use settlement::{to_base_units, SettlementError, LAMPORTS_DECIMALS};
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("transaction not found after {0} attempts")]
    NotFound(u32),

    #[error("transaction failed on-chain")]
    OnChainError,

    #[error("treasury account is not part of the transaction")]
    TreasuryNotInvolved,

    #[error("transaction was signed by {actual}, not {expected}")]
    SenderMismatch { expected: String, actual: String },

    #[error("treasury received {actual} lamports, expected {expected}")]
    AmountMismatch { expected: u64, actual: i128 },

    #[error("invalid amount: {0}")]
    Amount(#[from] SettlementError),

    #[error("malformed transaction record: {0}")]
    Malformed(String),

    #[error("RPC rejected the request: {0}")]
    Rejected(String),

    #[error("RPC request failed: {0}")]
    Rpc(String),
}

impl PaymentError {
    /// The RPC node could not be reached or answered garbage; the payment
    /// itself may still be fine.
    pub fn is_transport(&self) -> bool {
        matches!(self, PaymentError::Rpc(_))
    }
}

#[derive(Deserialize, Debug)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize, Debug)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TransactionRecord {
    pub meta: Option<TransactionMeta>,
    pub transaction: EncodedTransaction,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    pub err: Option<serde_json::Value>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub loaded_addresses: Option<LoadedAddresses>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoadedAddresses {
    #[serde(default)]
    pub writable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EncodedTransaction {
    pub message: TransactionMessage,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMessage {
    pub account_keys: Vec<String>,
}

impl TransactionRecord {
    /// Account keys in balance order: static keys, then loaded writable,
    /// then loaded readonly addresses.
    pub fn account_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .transaction
            .message
            .account_keys
            .iter()
            .map(String::as_str)
            .collect();
        if let Some(loaded) = self.meta.as_ref().and_then(|m| m.loaded_addresses.as_ref()) {
            keys.extend(loaded.writable.iter().map(String::as_str));
            keys.extend(loaded.readonly.iter().map(String::as_str));
        }
        keys
    }
}

/// Checks that `record` moved exactly `expected_lamports` from `sender` into
/// `treasury`. Exact equality only.
pub fn check_transaction(
    record: &TransactionRecord,
    treasury: &str,
    sender: &str,
    expected_lamports: u64,
) -> Result<(), PaymentError> {
    let meta = record
        .meta
        .as_ref()
        .ok_or_else(|| PaymentError::Malformed("missing meta".into()))?;

    if meta.err.is_some() {
        return Err(PaymentError::OnChainError);
    }

    let keys = record.account_keys();
    let treasury_index = keys
        .iter()
        .position(|k| *k == treasury)
        .ok_or(PaymentError::TreasuryNotInvolved)?;

    // The fee payer is always the first account key.
    let fee_payer = keys
        .first()
        .ok_or_else(|| PaymentError::Malformed("no account keys".into()))?;
    if *fee_payer != sender {
        return Err(PaymentError::SenderMismatch {
            expected: sender.to_string(),
            actual: fee_payer.to_string(),
        });
    }

    let pre = meta.pre_balances.get(treasury_index);
    let post = meta.post_balances.get(treasury_index);
    let (pre, post) = match (pre, post) {
        (Some(pre), Some(post)) => (*pre, *post),
        _ => return Err(PaymentError::Malformed("balance index out of range".into())),
    };

    let received = i128::from(post) - i128::from(pre);
    if received != i128::from(expected_lamports) {
        return Err(PaymentError::AmountMismatch {
            expected: expected_lamports,
            actual: received,
        });
    }

    Ok(())
}

pub struct PaymentVerifier {
    client: reqwest::Client,
    rpc_url: String,
    treasury_wallet: String,
    attempts: u32,
    delay: Duration,
}

impl PaymentVerifier {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            rpc_url: config.solana_rpc_url.clone(),
            treasury_wallet: config.treasury_wallet.clone(),
            attempts: config.payment_verify_attempts,
            delay: config.payment_verify_delay,
        })
    }

    /// Confirms `signature` paid `expected_amount` SOL from `sender` to the
    /// treasury. Freshly submitted transactions may not be indexed yet, so a
    /// missing record is retried with a fixed delay.
    pub async fn verify(
        &self,
        signature: &str,
        expected_amount: Decimal,
        sender: &str,
    ) -> Result<(), PaymentError> {
        let expected_lamports = to_base_units(expected_amount, LAMPORTS_DECIMALS)?;

        for attempt in 1..=self.attempts {
            match self.fetch_transaction(signature).await? {
                Some(record) => {
                    check_transaction(&record, &self.treasury_wallet, sender, expected_lamports)?;
                    info!(
                        "Verified payment: signature={}, sender={}, lamports={}",
                        signature, sender, expected_lamports
                    );
                    return Ok(());
                }
                None => {
                    warn!(
                        "Transaction {} not found (attempt {}/{})",
                        signature, attempt, self.attempts
                    );
                    if attempt < self.attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        Err(PaymentError::NotFound(self.attempts))
    }

    async fn fetch_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, PaymentError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTransaction",
            "params": [
                signature,
                {
                    "encoding": "json",
                    "commitment": "confirmed",
                    "maxSupportedTransactionVersion": 0
                }
            ]
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Rpc(e.to_string()))?
            .error_for_status()
            .map_err(|e| PaymentError::Rpc(e.to_string()))?
            .json::<RpcResponse<TransactionRecord>>()
            .await
            .map_err(|e| PaymentError::Rpc(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(PaymentError::Rejected(format!(
                "{} ({})",
                error.message, error.code
            )));
        }

        Ok(response.result)
    }
}
