use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::Slot;

#[derive(Debug)]
pub enum LedgerError {
    /// Unknown or inactive facility. Callers treat both the same way.
    FacilityNotFound(String),
    BookingNotFound(Ulid),
    /// Definitive business rejection — the slot is held by a non-cancelled
    /// booking. Never retried.
    SlotTaken {
        facility_id: String,
        date: NaiveDate,
        slot: Slot,
    },
    Validation(String),
    LimitExceeded(&'static str),
    Journal(String),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::FacilityNotFound(id) => write!(f, "facility not found: {id}"),
            LedgerError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            LedgerError::SlotTaken {
                facility_id,
                date,
                slot,
            } => {
                write!(f, "slot {slot} on {date} at {facility_id} is already booked")
            }
            LedgerError::Validation(msg) => write!(f, "invalid request: {msg}"),
            LedgerError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            LedgerError::Journal(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for LedgerError {}
