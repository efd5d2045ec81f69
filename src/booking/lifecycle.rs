//! Booking status state machine
//!
//! ```text
//! pending ──▶ confirmed ──▶ completed
//!    │            │
//!    ├──▶ cancelled ◀──┤
//!    └──▶ rejected  ◀──┘
//! ```
//!
//! `completed`, `cancelled` and `rejected` are terminal.

use crate::core::error::{BookingError, DerlgError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Rejected,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Rejected
        )
    }

    /// Pending and confirmed bookings hold inventory
    pub fn occupies_room(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, Rejected)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, Rejected)
        )
    }

    /// Validate an edge, returning the target status
    pub fn transition(self, next: BookingStatus) -> Result<BookingStatus, DerlgError> {
        if self == BookingStatus::Cancelled && next == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled.into());
        }
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BookingError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            }
            .into())
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DerlgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                crate::core::error::ValidationError::field(
                    "status",
                    format!("unknown booking status '{}'", s),
                )
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn test_allowed_edges() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn test_terminal_states_reject_every_transition() {
        for from in [Completed, Cancelled, Rejected] {
            assert!(from.is_terminal());
            for to in BookingStatus::ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
                assert!(from.transition(to).is_err());
            }
        }
    }

    #[test]
    fn test_invalid_edge_error_codes() {
        let err = Completed.transition(Confirmed).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "BKG_7006");

        let err = Cancelled.transition(Cancelled).unwrap_err();
        assert_eq!(err.error_code(), "BKG_7002");
    }

    #[test]
    fn test_parse() {
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), Confirmed);
        assert!("archived".parse::<BookingStatus>().is_err());
    }
}
