use std::sync::Arc;

use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::{Ledger, LedgerError};

fn validate_facility(facility: &Facility) -> Result<(), LedgerError> {
    if facility.facility_id.trim().is_empty() {
        return Err(LedgerError::Validation("facility id must not be empty".into()));
    }
    if facility.facility_id.len() > MAX_FACILITY_ID_LEN {
        return Err(LedgerError::LimitExceeded("facility id too long"));
    }
    if facility.name.trim().is_empty() {
        return Err(LedgerError::Validation("facility name must not be empty".into()));
    }
    if facility.name.len() > MAX_NAME_LEN {
        return Err(LedgerError::LimitExceeded("facility name too long"));
    }
    Ok(())
}

fn validate_booking_request(req: &BookingRequest) -> Result<(), LedgerError> {
    if req.customer.name.trim().is_empty() {
        return Err(LedgerError::Validation("customer name is required".into()));
    }
    if req.customer.name.len() > MAX_NAME_LEN {
        return Err(LedgerError::LimitExceeded("customer name too long"));
    }
    if req.customer.phone.trim().is_empty() {
        return Err(LedgerError::Validation("customer phone is required".into()));
    }
    if req.customer.phone.len() > MAX_PHONE_LEN {
        return Err(LedgerError::LimitExceeded("customer phone too long"));
    }
    if let Some(email) = &req.customer.email
        && email.len() > MAX_EMAIL_LEN
    {
        return Err(LedgerError::LimitExceeded("customer email too long"));
    }
    if let Some(notes) = &req.notes
        && notes.len() > MAX_NOTES_LEN
    {
        return Err(LedgerError::LimitExceeded("notes too long"));
    }
    if let Some(duration) = req.duration_min
        && (duration == 0 || duration > MAX_DURATION_MIN)
    {
        return Err(LedgerError::Validation(format!(
            "duration must be between 1 and {MAX_DURATION_MIN} minutes"
        )));
    }
    Ok(())
}

impl Ledger {
    /// Create or update a facility record by id. Seeding and admin both land
    /// here; existing bookings are untouched.
    pub async fn upsert_facility(&self, facility: Facility) -> Result<(), LedgerError> {
        validate_facility(&facility)?;

        let event = Event::FacilityUpserted {
            facility: facility.clone(),
        };

        if let Some(state) = self.get_facility(&facility.facility_id) {
            let mut guard = state.write().await;
            self.persist_and_apply(&mut guard, &event).await?;
        } else {
            if self.facilities.len() >= MAX_FACILITIES {
                return Err(LedgerError::LimitExceeded("too many facilities"));
            }
            self.journal_append(&event).await?;
            self.facilities.insert(
                facility.facility_id.clone(),
                Arc::new(RwLock::new(FacilityState::new(facility))),
            );
        }

        metrics::gauge!(crate::observability::FACILITIES_TOTAL)
            .set(self.facilities.len() as f64);
        Ok(())
    }

    /// Soft delete. The facility drops out of availability and booking but
    /// its record and booking history stay.
    pub async fn deactivate_facility(&self, facility_id: &str) -> Result<Facility, LedgerError> {
        let state = self
            .get_facility(facility_id)
            .ok_or_else(|| LedgerError::FacilityNotFound(facility_id.to_string()))?;
        let mut guard = state.write().await;

        let event = Event::FacilityDeactivated {
            facility_id: facility_id.to_string(),
            at: now_ms(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(guard.facility.clone())
    }

    /// Validate and commit one booking.
    ///
    /// The facility write lock is held from the conflict check through the
    /// journal append, so two concurrent requests for the same slot
    /// serialize here: the second sees the first's booking and gets
    /// `SlotTaken`. A failed call persists nothing.
    pub async fn book(&self, req: BookingRequest) -> Result<Booking, LedgerError> {
        validate_booking_request(&req)?;

        let state = self
            .get_facility(&req.facility_id)
            .ok_or_else(|| LedgerError::FacilityNotFound(req.facility_id.clone()))?;
        let mut guard = state.write().await;

        if !guard.facility.is_active {
            return Err(LedgerError::FacilityNotFound(req.facility_id));
        }
        if guard.bookings.len() >= MAX_BOOKINGS_PER_FACILITY {
            return Err(LedgerError::LimitExceeded("too many bookings on facility"));
        }
        if guard.slot_holder(req.date, req.slot).is_some() {
            metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(LedgerError::SlotTaken {
                facility_id: req.facility_id,
                date: req.date,
                slot: req.slot,
            });
        }

        let now = now_ms();
        let booking = Booking {
            id: Ulid::new(),
            facility_id: req.facility_id,
            date: req.date,
            slot: req.slot,
            duration_min: req.duration_min.unwrap_or(DEFAULT_DURATION_MIN),
            customer_name: req.customer.name,
            customer_phone: req.customer.phone,
            customer_email: req.customer.email,
            booking_type: req.booking_type,
            status: BookingStatus::Confirmed,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };

        let event = Event::BookingRecorded {
            booking: booking.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        metrics::counter!(crate::observability::BOOKINGS_CONFIRMED_TOTAL).increment(1);
        Ok(booking)
    }

    /// Transition a booking to cancelled, freeing its slot. Cancelling an
    /// already-cancelled booking is a no-op success; nothing is journaled.
    pub async fn cancel(&self, booking_id: Ulid) -> Result<Booking, LedgerError> {
        let mut guard = self.resolve_booking_write(&booking_id).await?;

        let current = guard
            .booking(&booking_id)
            .ok_or(LedgerError::BookingNotFound(booking_id))?;
        if current.status == BookingStatus::Cancelled {
            return Ok(current.clone());
        }

        let event = Event::BookingCancelled {
            booking_id,
            facility_id: guard.facility.facility_id.clone(),
            at: now_ms(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        metrics::counter!(crate::observability::BOOKINGS_CANCELLED_TOTAL).increment(1);

        guard
            .booking(&booking_id)
            .cloned()
            .ok_or(LedgerError::BookingNotFound(booking_id))
    }
}
