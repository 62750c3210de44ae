//! Ticket pool settlement rules.
//!
//! Everything in this crate is pure: callers load rows, turn them into
//! snapshots, ask for a plan and then persist what the plan says. A rejected
//! plan leaves the snapshots untouched.

pub mod claim;
pub mod errors;
pub mod payout;
pub mod purchase;
pub mod snapshot;
pub mod status;
pub mod units;

pub use claim::{claim_amounts, plan_claim, ClaimAmounts, ClaimPlan, CLAIM_FEE_BPS};
pub use errors::SettlementError;
pub use payout::{plan_cancellation, plan_resolution, ResolutionOutcome, ResolutionPlan};
pub use purchase::{plan_purchase, PurchasePlan, PurchaseRequest};
pub use snapshot::{EventSnapshot, OptionSnapshot, TicketSnapshot};
pub use status::{EventStatus, TicketStatus, UserRole};
pub use units::{to_base_units, LAMPORTS_DECIMALS};

/// Basis-point denominator shared by every fee calculation.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Payouts and fees are kept at lamport precision.
pub const AMOUNT_SCALE: u32 = 9;
