use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::{SettlementError, SettlementResult};
use crate::payout::{bps_of, truncate};
use crate::snapshot::TicketSnapshot;
use crate::status::TicketStatus;
use crate::BPS_DENOMINATOR;

/// Flat platform fee charged when a payout is claimed (1%).
pub const CLAIM_FEE_BPS: u32 = 100;

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ClaimAmounts {
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ClaimPlan {
    pub ticket_id: i64,
    pub previous_status: TicketStatus,
    pub amounts: ClaimAmounts,
}

/// `net = payout * 0.99`, truncated to lamports. The fee is whatever the
/// truncation leaves, so `net + fee == gross` always holds.
pub fn claim_amounts(payout: Decimal) -> ClaimAmounts {
    let keep_bps = BPS_DENOMINATOR - CLAIM_FEE_BPS;
    let net = bps_of(payout, keep_bps);
    ClaimAmounts {
        gross: payout,
        fee: truncate(payout - net),
        net,
    }
}

pub fn plan_claim(
    ticket: &TicketSnapshot,
    caller_id: i64,
    settled_at: Option<DateTime<Utc>>,
    claim_delay: Duration,
    now: DateTime<Utc>,
) -> SettlementResult<ClaimPlan> {
    if ticket.user_id != caller_id {
        return Err(SettlementError::NotTicketOwner);
    }

    match ticket.status {
        TicketStatus::Claimed => return Err(SettlementError::AlreadyClaimed),
        status if !status.is_claimable() => {
            return Err(SettlementError::TicketNotClaimable(status))
        }
        _ => {}
    }

    let payout = ticket.payout_amount.ok_or(SettlementError::MissingPayout)?;

    if let Some(settled_at) = settled_at {
        let opens_at = settled_at + claim_delay;
        if now < opens_at {
            return Err(SettlementError::ClaimWindowOpen {
                remaining_secs: (opens_at - now).num_seconds().max(1),
            });
        }
    }

    Ok(ClaimPlan {
        ticket_id: ticket.id,
        previous_status: ticket.status,
        amounts: claim_amounts(payout),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn won_ticket() -> TicketSnapshot {
        TicketSnapshot {
            id: 5,
            user_id: 42,
            event_id: 1,
            option_id: 11,
            status: TicketStatus::Won,
            purchase_price: dec!(10),
            payout_amount: Some(dec!(25)),
        }
    }

    #[test]
    fn test_one_percent_fee() {
        let amounts = claim_amounts(dec!(25));
        assert_eq!(amounts.net, dec!(24.75));
        assert_eq!(amounts.fee, dec!(0.25));
        assert_eq!(amounts.net + amounts.fee, amounts.gross);
    }

    #[test]
    fn test_fee_at_lamport_precision() {
        let amounts = claim_amounts(dec!(0.000000150));
        assert_eq!(amounts.net, dec!(0.000000148));
        assert_eq!(amounts.fee, dec!(0.000000002));
    }

    #[test]
    fn test_claim_won_ticket() {
        let now = Utc::now();
        let plan = plan_claim(&won_ticket(), 42, Some(now), Duration::zero(), now).unwrap();
        assert_eq!(plan.amounts.net, dec!(24.75));
        assert_eq!(plan.previous_status, TicketStatus::Won);
    }

    #[test]
    fn test_claim_refunded_ticket() {
        let mut ticket = won_ticket();
        ticket.status = TicketStatus::Refunded;
        ticket.payout_amount = Some(dec!(10));

        let now = Utc::now();
        let plan = plan_claim(&ticket, 42, Some(now), Duration::zero(), now).unwrap();
        assert_eq!(plan.amounts.net, dec!(9.9));
    }

    #[test]
    fn test_second_claim_fails() {
        let mut ticket = won_ticket();
        ticket.status = TicketStatus::Claimed;

        let now = Utc::now();
        let err = plan_claim(&ticket, 42, Some(now), Duration::zero(), now).unwrap_err();
        assert_eq!(err, SettlementError::AlreadyClaimed);
    }

    #[test]
    fn test_lost_and_active_tickets_not_claimable() {
        let now = Utc::now();
        for status in [TicketStatus::Lost, TicketStatus::Active] {
            let mut ticket = won_ticket();
            ticket.status = status;
            let err = plan_claim(&ticket, 42, Some(now), Duration::zero(), now).unwrap_err();
            assert_eq!(err, SettlementError::TicketNotClaimable(status));
        }
    }

    #[test]
    fn test_only_owner_can_claim() {
        let now = Utc::now();
        let err = plan_claim(&won_ticket(), 7, Some(now), Duration::zero(), now).unwrap_err();
        assert_eq!(err, SettlementError::NotTicketOwner);
    }

    #[test]
    fn test_claim_delay_window() {
        let settled = Utc::now();
        let delay = Duration::minutes(10);

        let now = settled + Duration::minutes(4);
        let err = plan_claim(&won_ticket(), 42, Some(settled), delay, now).unwrap_err();
        assert_eq!(err, SettlementError::ClaimWindowOpen { remaining_secs: 360 });

        assert!(plan_claim(&won_ticket(), 42, Some(settled), delay, settled + delay).is_ok());
    }

    #[test]
    fn test_missing_payout() {
        let mut ticket = won_ticket();
        ticket.payout_amount = None;
        let now = Utc::now();
        let err = plan_claim(&ticket, 42, None, Duration::zero(), now).unwrap_err();
        assert_eq!(err, SettlementError::MissingPayout);
    }
}
