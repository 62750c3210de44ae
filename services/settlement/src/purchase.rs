use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::{SettlementError, SettlementResult};
use crate::snapshot::{EventSnapshot, OptionSnapshot};
use crate::status::EventStatus;

#[derive(Debug, Clone)]
pub struct PurchaseRequest<'a> {
    pub option_id: i64,
    pub quantity: i32,
    pub wallet_address: &'a str,
    /// Whether a ticket already references the purchase signature.
    pub signature_used: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PurchasePlan {
    pub event_id: i64,
    pub option_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    /// Event-wide sequence number of the first ticket in this purchase.
    pub first_sequence: i32,
}

impl PurchasePlan {
    /// Sequence numbers of the tickets this purchase creates, paired with
    /// their position inside the purchase (starting at 1).
    pub fn ticket_sequences(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.quantity).map(move |i| (i + 1, self.first_sequence + i))
    }

    pub fn serial_number(&self, sequence: i32) -> String {
        format!("JP-{}-{:06}", self.event_id, sequence)
    }

    /// Applies the counter updates to the snapshots the plan was built from.
    pub fn apply(&self, event: &mut EventSnapshot, option: &mut OptionSnapshot) {
        event.tickets_sold += self.quantity;
        event.pool_amount += self.total_cost;
        option.tickets_sold += self.quantity;
        option.pool_amount += self.total_cost;
    }
}

/// Validates a ticket purchase against the current event and option state.
///
/// Checks run in a fixed order so callers can rely on which error wins:
/// quantity, event status, lock time, option ownership, treasury wallet,
/// event capacity, option limit, signature reuse.
///
/// `LockTimePassed` tells the caller the event should be flipped to
/// `locked`; the purchase itself is rejected either way.
pub fn plan_purchase(
    event: &EventSnapshot,
    option: &OptionSnapshot,
    request: &PurchaseRequest<'_>,
    treasury_wallet: &str,
    now: DateTime<Utc>,
) -> SettlementResult<PurchasePlan> {
    if request.quantity < 1 {
        return Err(SettlementError::InvalidQuantity);
    }

    if event.status != EventStatus::Open {
        return Err(SettlementError::EventNotOpen(event.status));
    }

    if now >= event.lock_time {
        return Err(SettlementError::LockTimePassed);
    }

    if option.id != request.option_id || option.event_id != event.id {
        return Err(SettlementError::OptionNotInEvent {
            option_id: request.option_id,
            event_id: event.id,
        });
    }

    if request.wallet_address == treasury_wallet {
        return Err(SettlementError::TreasuryWalletPurchase);
    }

    let remaining = event.remaining_capacity();
    if request.quantity > remaining {
        return Err(SettlementError::InsufficientCapacity {
            requested: request.quantity,
            remaining,
        });
    }

    if let Some(option_remaining) = option.remaining() {
        if request.quantity > option_remaining {
            return Err(SettlementError::OptionSoldOut {
                requested: request.quantity,
                remaining: option_remaining,
            });
        }
    }

    if request.signature_used {
        return Err(SettlementError::SignatureAlreadyUsed);
    }

    if event.ticket_price <= Decimal::ZERO {
        return Err(SettlementError::InvalidTicketPrice);
    }

    let total_cost = event
        .ticket_price
        .checked_mul(Decimal::from(request.quantity))
        .ok_or(SettlementError::AmountOverflow(event.ticket_price))?;

    Ok(PurchasePlan {
        event_id: event.id,
        option_id: option.id,
        quantity: request.quantity,
        unit_price: event.ticket_price,
        total_cost,
        first_sequence: event.tickets_sold + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    const TREASURY: &str = "TreasuryWa11et1111111111111111111111111111";
    const BUYER: &str = "BuyerWa11et11111111111111111111111111111111";

    fn open_event(now: DateTime<Utc>) -> EventSnapshot {
        EventSnapshot {
            id: 7,
            status: EventStatus::Open,
            ticket_price: dec!(10),
            max_tickets: 100,
            tickets_sold: 0,
            pool_amount: Decimal::ZERO,
            lock_time: now + Duration::hours(1),
            resolved_at: None,
        }
    }

    fn option() -> OptionSnapshot {
        OptionSnapshot {
            id: 70,
            event_id: 7,
            ticket_limit: None,
            tickets_sold: 0,
            pool_amount: Decimal::ZERO,
        }
    }

    fn request(quantity: i32) -> PurchaseRequest<'static> {
        PurchaseRequest {
            option_id: 70,
            quantity,
            wallet_address: BUYER,
            signature_used: false,
        }
    }

    #[test]
    fn test_purchase_updates_pool_and_sold() {
        let now = Utc::now();
        let mut event = open_event(now);
        let mut option = option();

        let plan = plan_purchase(&event, &option, &request(5), TREASURY, now).unwrap();
        assert_eq!(plan.total_cost, dec!(50));
        assert_eq!(plan.first_sequence, 1);

        plan.apply(&mut event, &mut option);
        assert_eq!(event.pool_amount, dec!(50));
        assert_eq!(event.tickets_sold, 5);
        assert_eq!(option.pool_amount, dec!(50));
        assert_eq!(option.tickets_sold, 5);
    }

    #[test]
    fn test_over_capacity_is_rejected() {
        let now = Utc::now();
        let mut event = open_event(now);
        event.tickets_sold = 5;
        event.pool_amount = dec!(50);
        let before = event.clone();

        let err = plan_purchase(&event, &option(), &request(96), TREASURY, now).unwrap_err();
        assert_eq!(
            err,
            SettlementError::InsufficientCapacity {
                requested: 96,
                remaining: 95
            }
        );
        assert_eq!(event, before);

        assert!(plan_purchase(&event, &option(), &request(95), TREASURY, now).is_ok());
    }

    #[test]
    fn test_reused_signature_is_rejected() {
        let now = Utc::now();
        let mut req = request(1);
        req.signature_used = true;

        let err = plan_purchase(&open_event(now), &option(), &req, TREASURY, now).unwrap_err();
        assert_eq!(err, SettlementError::SignatureAlreadyUsed);
    }

    #[test]
    fn test_event_must_be_open() {
        let now = Utc::now();
        let mut event = open_event(now);
        event.status = EventStatus::Upcoming;

        let err = plan_purchase(&event, &option(), &request(1), TREASURY, now).unwrap_err();
        assert_eq!(err, SettlementError::EventNotOpen(EventStatus::Upcoming));
    }

    #[test]
    fn test_lock_time_passed() {
        let now = Utc::now();
        let mut event = open_event(now);
        event.lock_time = now - Duration::seconds(1);

        let err = plan_purchase(&event, &option(), &request(1), TREASURY, now).unwrap_err();
        assert_eq!(err, SettlementError::LockTimePassed);
    }

    #[test]
    fn test_treasury_cannot_buy() {
        let now = Utc::now();
        let mut req = request(1);
        req.wallet_address = TREASURY;

        let err = plan_purchase(&open_event(now), &option(), &req, TREASURY, now).unwrap_err();
        assert_eq!(err, SettlementError::TreasuryWalletPurchase);
    }

    #[test]
    fn test_option_limit() {
        let now = Utc::now();
        let mut opt = option();
        opt.ticket_limit = Some(10);
        opt.tickets_sold = 8;

        let err = plan_purchase(&open_event(now), &opt, &request(3), TREASURY, now).unwrap_err();
        assert_eq!(
            err,
            SettlementError::OptionSoldOut {
                requested: 3,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_option_from_other_event() {
        let now = Utc::now();
        let mut opt = option();
        opt.event_id = 8;

        let err = plan_purchase(&open_event(now), &opt, &request(1), TREASURY, now).unwrap_err();
        assert!(matches!(err, SettlementError::OptionNotInEvent { .. }));
    }

    #[test]
    fn test_zero_quantity() {
        let now = Utc::now();
        let err =
            plan_purchase(&open_event(now), &option(), &request(0), TREASURY, now).unwrap_err();
        assert_eq!(err, SettlementError::InvalidQuantity);
    }

    #[test]
    fn test_serials_continue_from_sold_count() {
        let now = Utc::now();
        let mut event = open_event(now);
        event.tickets_sold = 12;

        let plan = plan_purchase(&event, &option(), &request(2), TREASURY, now).unwrap();
        let serials: Vec<_> = plan
            .ticket_sequences()
            .map(|(index, seq)| (index, plan.serial_number(seq)))
            .collect();
        assert_eq!(
            serials,
            vec![(1, "JP-7-000013".to_string()), (2, "JP-7-000014".to_string())]
        );
    }
}
