use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SettlementError;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Upcoming,
    Open,
    Locked,
    Resolved,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Upcoming => "upcoming",
            EventStatus::Open => "open",
            EventStatus::Locked => "locked",
            EventStatus::Resolved => "resolved",
            EventStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Resolved | EventStatus::Cancelled)
    }

    /// Statuses only move forward. Cancellation is reachable from any
    /// non-terminal status.
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        use EventStatus::*;
        match (self, next) {
            (Draft, Upcoming) | (Upcoming, Open) | (Open, Locked) | (Locked, Resolved) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn transition_to(&self, next: EventStatus) -> Result<EventStatus, SettlementError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SettlementError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "upcoming" => Ok(EventStatus::Upcoming),
            "open" => Ok(EventStatus::Open),
            "locked" => Ok(EventStatus::Locked),
            "resolved" => Ok(EventStatus::Resolved),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(SettlementError::UnknownStatus {
                kind: "event status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Won,
    Lost,
    Claimed,
    Refunded,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Won => "won",
            TicketStatus::Lost => "lost",
            TicketStatus::Claimed => "claimed",
            TicketStatus::Refunded => "refunded",
        }
    }

    pub fn is_claimable(&self) -> bool {
        matches!(self, TicketStatus::Won | TicketStatus::Refunded)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TicketStatus::Active),
            "won" => Ok(TicketStatus::Won),
            "lost" => Ok(TicketStatus::Lost),
            "claimed" => Ok(TicketStatus::Claimed),
            "refunded" => Ok(TicketStatus::Refunded),
            other => Err(SettlementError::UnknownStatus {
                kind: "ticket status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Superadmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Superadmin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "superadmin" => Ok(UserRole::Superadmin),
            other => Err(SettlementError::UnknownStatus {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}
