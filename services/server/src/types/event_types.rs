use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settlement::EventStatus;
use validator::Validate;

#[derive(Deserialize, Validate, Debug)]
pub struct CreateEventRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3 to 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Category must be 2 to 50 characters"))]
    pub category: String,
    #[serde(default = "default_status")]
    pub status: EventStatus,
    pub ticket_price: Decimal,
    #[validate(range(min = 1, message = "Max tickets must be at least 1"))]
    pub max_tickets: i32,
    pub lock_time: DateTime<Utc>,
    pub event_time: DateTime<Utc>,
    pub resolve_time: Option<DateTime<Utc>>,
    #[validate(length(min = 2, max = 6, message = "An event needs 2 to 6 options"))]
    pub options: Vec<CreateOptionInput>,
}

fn default_status() -> EventStatus {
    EventStatus::Draft
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateOptionInput {
    pub label: String,
    pub ticket_limit: Option<i32>,
}

impl CreateEventRequest {
    /// Rules the derive can't express.
    pub fn check_terms(&self) -> Result<(), String> {
        if !matches!(
            self.status,
            EventStatus::Draft | EventStatus::Upcoming | EventStatus::Open
        ) {
            return Err(format!("Events cannot be created as {}", self.status));
        }
        if self.ticket_price <= Decimal::ZERO {
            return Err("Ticket price must be greater than zero".into());
        }
        if self.ticket_price.scale() > settlement::AMOUNT_SCALE {
            return Err("Ticket price has more than 9 decimals".into());
        }
        if self.lock_time > self.event_time {
            return Err("Lock time must not be after the event time".into());
        }
        if let Some(resolve_time) = self.resolve_time {
            if resolve_time < self.event_time {
                return Err("Resolve time must not be before the event time".into());
            }
        }
        for option in &self.options {
            if option.label.trim().is_empty() {
                return Err("Option labels cannot be empty".into());
            }
            if matches!(option.ticket_limit, Some(limit) if limit < 1) {
                return Err(format!("Ticket limit for '{}' must be at least 1", option.label));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusRequest {
    pub status: EventStatus,
}

#[derive(Deserialize, Validate, Debug)]
pub struct ResolveEventRequest {
    #[validate(range(min = 1, message = "Winning option ID must be greater than 0"))]
    pub winning_option_id: i64,
}

#[derive(Deserialize, Debug)]
pub struct EventQuery {
    pub status: Option<EventStatus>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl EventQuery {
    pub fn is_unfiltered(&self) -> bool {
        self.status.is_none()
            && self.category.is_none()
            && self.limit.is_none()
            && self.offset.is_none()
    }

    pub fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(50).clamp(1, 100);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn request() -> CreateEventRequest {
        let lock_time = Utc::now() + Duration::days(1);
        CreateEventRequest {
            title: "Cup final".into(),
            description: None,
            category: "sports".into(),
            status: EventStatus::Open,
            ticket_price: dec!(0.1),
            max_tickets: 100,
            lock_time,
            event_time: lock_time + Duration::hours(1),
            resolve_time: None,
            options: vec![
                CreateOptionInput { label: "Home".into(), ticket_limit: None },
                CreateOptionInput { label: "Away".into(), ticket_limit: Some(50) },
            ],
        }
    }

    #[test]
    fn test_valid_request() {
        let req = request();
        assert!(req.validate().is_ok());
        assert!(req.check_terms().is_ok());
    }

    #[test]
    fn test_option_count() {
        let mut req = request();
        req.options.truncate(1);
        assert!(req.validate().is_err());

        let mut req = request();
        req.options = (0..7)
            .map(|i| CreateOptionInput { label: format!("o{}", i), ticket_limit: None })
            .collect();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_terms() {
        let mut req = request();
        req.ticket_price = Decimal::ZERO;
        assert!(req.check_terms().is_err());

        let mut req = request();
        req.lock_time = req.event_time + Duration::minutes(1);
        assert!(req.check_terms().is_err());

        let mut req = request();
        req.status = EventStatus::Resolved;
        assert!(req.check_terms().is_err());

        let mut req = request();
        req.ticket_price = dec!(0.0000000001);
        assert!(req.check_terms().is_err());
    }

    #[test]
    fn test_paging() {
        let query = EventQuery { status: None, category: None, limit: Some(500), offset: Some(-3) };
        assert_eq!(query.page(), (100, 0));
        assert!(!query.is_unfiltered());
    }
}
