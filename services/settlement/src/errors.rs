use rust_decimal::Decimal;
use thiserror::Error;

use crate::status::{EventStatus, TicketStatus};

pub type SettlementResult<T> = Result<T, SettlementError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Event is not open for ticket purchases (status: {0})")]
    EventNotOpen(EventStatus),

    #[error("Event is locked: the lock time has passed")]
    LockTimePassed,

    #[error("Option {option_id} does not belong to event {event_id}")]
    OptionNotInEvent { option_id: i64, event_id: i64 },

    #[error("The platform treasury wallet cannot purchase tickets")]
    TreasuryWalletPurchase,

    #[error("Only {remaining} tickets remaining, cannot purchase {requested}")]
    InsufficientCapacity { requested: i32, remaining: i32 },

    #[error("Only {remaining} tickets remaining on this option, cannot purchase {requested}")]
    OptionSoldOut { requested: i32, remaining: i32 },

    #[error("This transaction signature has already been used")]
    SignatureAlreadyUsed,

    #[error("Ticket price must be greater than zero")]
    InvalidTicketPrice,

    #[error("Amount {0} overflows the supported range")]
    AmountOverflow(Decimal),

    #[error("Amount {amount} is not representable with {decimals} decimals")]
    SubUnitAmount { amount: Decimal, decimals: u32 },

    #[error("Cannot move event from {from} to {to}")]
    InvalidTransition { from: EventStatus, to: EventStatus },

    #[error("Event must be locked before it can be resolved (status: {0})")]
    EventNotLocked(EventStatus),

    #[error("Event is already settled (status: {0})")]
    EventAlreadySettled(EventStatus),

    #[error("You do not own this ticket")]
    NotTicketOwner,

    #[error("Ticket has already been claimed")]
    AlreadyClaimed,

    #[error("Ticket is not claimable (status: {0})")]
    TicketNotClaimable(TicketStatus),

    #[error("Ticket has no payout amount recorded")]
    MissingPayout,

    #[error("Claims open in {remaining_secs} seconds")]
    ClaimWindowOpen { remaining_secs: i64 },

    #[error("Unknown {kind} '{value}'")]
    UnknownStatus { kind: &'static str, value: String },
}

impl SettlementError {
    /// Conflicts are errors caused by state another request already changed.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SettlementError::SignatureAlreadyUsed
                | SettlementError::AlreadyClaimed
                | SettlementError::EventAlreadySettled(_)
                | SettlementError::InsufficientCapacity { .. }
                | SettlementError::OptionSoldOut { .. }
        )
    }
}
