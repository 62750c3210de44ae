use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::errors::{SettlementError, SettlementResult};
use crate::snapshot::{EventSnapshot, OptionSnapshot};
use crate::status::EventStatus;
use crate::{AMOUNT_SCALE, BPS_DENOMINATOR};

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Active tickets on the winning option become `won` with this payout,
    /// every other active ticket becomes `lost`.
    Winners {
        winner_count: i64,
        payout_per_ticket: Decimal,
    },
    /// Every active ticket becomes `refunded` at its purchase price.
    RefundAll,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResolutionPlan {
    pub event_id: i64,
    pub winning_option_id: i64,
    pub pool_amount: Decimal,
    pub platform_fee: Decimal,
    pub distributable: Decimal,
    pub outcome: ResolutionOutcome,
}

pub(crate) fn truncate(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero)
}

pub(crate) fn bps_of(amount: Decimal, bps: u32) -> Decimal {
    let bps = bps.min(BPS_DENOMINATOR);
    truncate(amount * Decimal::from(bps) / Decimal::from(BPS_DENOMINATOR))
}

/// Splits the event pool between the tickets on the winning option.
///
/// The platform fee is taken off the whole pool first. Per-ticket payouts
/// are truncated to lamport precision, so their sum never exceeds the
/// distributable amount. When nobody backed the winning option the pool is
/// returned instead and no fee is charged.
pub fn plan_resolution(
    event: &EventSnapshot,
    winning_option: &OptionSnapshot,
    winning_ticket_count: i64,
    fee_bps: u32,
) -> SettlementResult<ResolutionPlan> {
    if event.status.is_terminal() {
        return Err(SettlementError::EventAlreadySettled(event.status));
    }
    if event.status != EventStatus::Locked {
        return Err(SettlementError::EventNotLocked(event.status));
    }
    if winning_option.event_id != event.id {
        return Err(SettlementError::OptionNotInEvent {
            option_id: winning_option.id,
            event_id: event.id,
        });
    }

    if winning_ticket_count <= 0 {
        return Ok(ResolutionPlan {
            event_id: event.id,
            winning_option_id: winning_option.id,
            pool_amount: event.pool_amount,
            platform_fee: Decimal::ZERO,
            distributable: event.pool_amount,
            outcome: ResolutionOutcome::RefundAll,
        });
    }

    let platform_fee = bps_of(event.pool_amount, fee_bps);
    let distributable = event.pool_amount - platform_fee;
    let payout_per_ticket = truncate(distributable / Decimal::from(winning_ticket_count));

    Ok(ResolutionPlan {
        event_id: event.id,
        winning_option_id: winning_option.id,
        pool_amount: event.pool_amount,
        platform_fee,
        distributable,
        outcome: ResolutionOutcome::Winners {
            winner_count: winning_ticket_count,
            payout_per_ticket,
        },
    })
}

/// Cancelling refunds every active ticket at its purchase price.
pub fn plan_cancellation(event: &EventSnapshot) -> SettlementResult<ResolutionOutcome> {
    event.status.transition_to(EventStatus::Cancelled)?;
    Ok(ResolutionOutcome::RefundAll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn locked_event(pool: Decimal) -> EventSnapshot {
        EventSnapshot {
            id: 1,
            status: EventStatus::Locked,
            ticket_price: dec!(10),
            max_tickets: 100,
            tickets_sold: 10,
            pool_amount: pool,
            lock_time: Utc::now(),
            resolved_at: None,
        }
    }

    fn winner(event_id: i64) -> OptionSnapshot {
        OptionSnapshot {
            id: 11,
            event_id,
            ticket_limit: None,
            tickets_sold: 3,
            pool_amount: dec!(30),
        }
    }

    #[test]
    fn test_pool_split_without_fee() {
        let plan = plan_resolution(&locked_event(dec!(100)), &winner(1), 4, 0).unwrap();
        assert_eq!(plan.platform_fee, Decimal::ZERO);
        assert_eq!(
            plan.outcome,
            ResolutionOutcome::Winners {
                winner_count: 4,
                payout_per_ticket: dec!(25)
            }
        );
    }

    #[test]
    fn test_pool_split_with_fee() {
        let plan = plan_resolution(&locked_event(dec!(100)), &winner(1), 4, 500).unwrap();
        assert_eq!(plan.platform_fee, dec!(5));
        assert_eq!(plan.distributable, dec!(95));
        assert_eq!(
            plan.outcome,
            ResolutionOutcome::Winners {
                winner_count: 4,
                payout_per_ticket: dec!(23.75)
            }
        );
    }

    #[test]
    fn test_payout_truncates_to_lamports() {
        let plan = plan_resolution(&locked_event(dec!(10)), &winner(1), 3, 0).unwrap();
        let ResolutionOutcome::Winners { payout_per_ticket, .. } = plan.outcome else {
            panic!("expected winners");
        };
        assert_eq!(payout_per_ticket, dec!(3.333333333));
        assert!(payout_per_ticket * Decimal::from(3) <= plan.distributable);
    }

    #[test]
    fn test_no_winners_refunds_everyone() {
        let plan = plan_resolution(&locked_event(dec!(100)), &winner(1), 0, 500).unwrap();
        assert_eq!(plan.outcome, ResolutionOutcome::RefundAll);
        assert_eq!(plan.platform_fee, Decimal::ZERO);
    }

    #[test]
    fn test_requires_locked_event() {
        let mut event = locked_event(dec!(100));
        event.status = EventStatus::Open;
        let err = plan_resolution(&event, &winner(1), 1, 0).unwrap_err();
        assert_eq!(err, SettlementError::EventNotLocked(EventStatus::Open));

        event.status = EventStatus::Resolved;
        let err = plan_resolution(&event, &winner(1), 1, 0).unwrap_err();
        assert_eq!(err, SettlementError::EventAlreadySettled(EventStatus::Resolved));
    }

    #[test]
    fn test_winner_must_belong_to_event() {
        let err = plan_resolution(&locked_event(dec!(100)), &winner(2), 1, 0).unwrap_err();
        assert!(matches!(err, SettlementError::OptionNotInEvent { option_id: 11, event_id: 1 }));
    }

    #[test]
    fn test_cancellation() {
        let event = locked_event(dec!(100));
        assert_eq!(plan_cancellation(&event).unwrap(), ResolutionOutcome::RefundAll);

        let mut resolved = event.clone();
        resolved.status = EventStatus::Resolved;
        assert!(plan_cancellation(&resolved).is_err());
    }
}
