use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::*;

// ── Availability Algorithm ───────────────────────────────────────

/// Slots held by a non-cancelled booking on `date`.
pub fn booked_slots(state: &FacilityState, date: NaiveDate) -> Vec<Slot> {
    state
        .bookings
        .iter()
        .filter(|b| b.status.blocks_slot() && b.date == date)
        .map(|b| b.slot)
        .collect()
}

/// Free slots for one facility on one calendar day:
/// catalog − booked, preserving catalog order.
pub fn free_slots(state: &FacilityState, date: NaiveDate) -> Vec<Slot> {
    let booked: HashSet<Slot> = booked_slots(state, date).into_iter().collect();
    all_slots()
        .into_iter()
        .filter(|slot| !booked.contains(slot))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn rink() -> Facility {
        Facility {
            facility_id: "rink-1".into(),
            name: "Central Ice Arena".into(),
            address: "123 Main St".into(),
            city: "Ottawa".into(),
            province: "ON".into(),
            postal_code: "K1A 0A1".into(),
            phone: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn booking(date: &str, slot: &str, status: BookingStatus) -> Booking {
        Booking {
            id: Ulid::new(),
            facility_id: "rink-1".into(),
            date: date.parse().unwrap(),
            slot: slot.parse().unwrap(),
            duration_min: DEFAULT_DURATION_MIN,
            customer_name: "Alice Tremblay".into(),
            customer_phone: "613-555-0101".into(),
            customer_email: None,
            booking_type: BookingType::IceTime,
            status,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn every_slot_free_without_bookings() {
        let state = FacilityState::new(rink());
        let free = free_slots(&state, day("2025-06-10"));
        assert_eq!(free, all_slots());
    }

    #[test]
    fn booked_slot_removed_in_catalog_order() {
        let mut state = FacilityState::new(rink());
        state
            .bookings
            .push(booking("2025-06-10", "14:00", BookingStatus::Confirmed));

        let free = free_slots(&state, day("2025-06-10"));
        assert_eq!(free.len(), SLOT_COUNT - 1);
        assert!(!free.contains(&"14:00".parse().unwrap()));
        // Order is preserved: the remaining slots match the catalog minus 14:00
        let expected: Vec<Slot> = all_slots()
            .into_iter()
            .filter(|s| s.to_string() != "14:00")
            .collect();
        assert_eq!(free, expected);
    }

    #[test]
    fn pending_booking_blocks_too() {
        let mut state = FacilityState::new(rink());
        state
            .bookings
            .push(booking("2025-06-10", "09:00", BookingStatus::Pending));
        let free = free_slots(&state, day("2025-06-10"));
        assert!(!free.contains(&"09:00".parse().unwrap()));
    }

    #[test]
    fn cancelled_booking_does_not_block() {
        let mut state = FacilityState::new(rink());
        state
            .bookings
            .push(booking("2025-06-10", "14:00", BookingStatus::Cancelled));
        let free = free_slots(&state, day("2025-06-10"));
        assert_eq!(free, all_slots());
    }

    #[test]
    fn other_days_do_not_block() {
        let mut state = FacilityState::new(rink());
        state
            .bookings
            .push(booking("2025-06-10", "14:00", BookingStatus::Confirmed));
        let free = free_slots(&state, day("2025-06-11"));
        assert_eq!(free, all_slots());
    }

    #[test]
    fn fully_booked_day_has_no_free_slots() {
        let mut state = FacilityState::new(rink());
        for slot in all_slots() {
            state
                .bookings
                .push(booking("2025-06-10", &slot.to_string(), BookingStatus::Confirmed));
        }
        assert!(free_slots(&state, day("2025-06-10")).is_empty());
    }
}
