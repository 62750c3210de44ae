pub mod admin_types;
pub mod auth_types;
pub mod event_types;
pub mod ticket_types;

use validator::ValidationError;

use crate::utils::wallet::is_valid_address;

pub(crate) fn validate_wallet_address(address: &str) -> Result<(), ValidationError> {
    if is_valid_address(address) {
        Ok(())
    } else {
        let mut err = ValidationError::new("wallet_address");
        err.message = Some("Invalid wallet address".into());
        Err(err)
    }
}
