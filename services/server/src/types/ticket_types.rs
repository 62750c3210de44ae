use serde::Deserialize;
use validator::Validate;

use super::validate_wallet_address;

pub const MAX_TICKETS_PER_PURCHASE: i32 = 1000;

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct PurchaseTicketInput {
    #[validate(range(min = 1, message = "Event ID must be greater than 0"))]
    pub event_id: i64,

    #[validate(range(min = 1, message = "Option ID must be greater than 0"))]
    pub option_id: i64,

    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,

    #[validate(length(min = 32, max = 128, message = "Invalid transaction signature"))]
    pub transaction_signature: String,

    #[validate(custom = "validate_wallet_address")]
    pub wallet_address: String,
}

#[derive(Deserialize, Validate, Debug)]
pub struct ClaimTicketInput {
    #[validate(range(min = 1, message = "Ticket ID must be greater than 0"))]
    pub ticket_id: i64,
}

#[derive(Deserialize, Debug)]
pub struct MyTicketsQuery {
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(quantity: i32) -> PurchaseTicketInput {
        PurchaseTicketInput {
            event_id: 1,
            option_id: 2,
            quantity,
            transaction_signature: "5".repeat(88),
            wallet_address: "11111111111111111111111111111111".into(),
        }
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(input(1).validate().is_ok());
        assert!(input(MAX_TICKETS_PER_PURCHASE).validate().is_ok());
        assert!(input(0).validate().is_err());
        assert!(input(MAX_TICKETS_PER_PURCHASE + 1).validate().is_err());
    }

    #[test]
    fn test_signature_required() {
        let mut bad = input(1);
        bad.transaction_signature = String::new();
        assert!(bad.validate().unwrap_err().field_errors().contains_key("transaction_signature"));
    }
}
