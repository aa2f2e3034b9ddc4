use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::availability::free_slots;
use super::{Ledger, SharedFacilityState};

impl Ledger {
    fn facility_states(&self) -> Vec<SharedFacilityState> {
        // Clone the Arcs out first; never hold a map shard across an await.
        self.facilities.iter().map(|e| e.value().clone()).collect()
    }

    pub fn facility_count(&self) -> usize {
        self.facilities.len()
    }

    /// Active facilities sorted by name ascending.
    pub async fn list_active_facilities(&self) -> Vec<Facility> {
        let mut out = Vec::new();
        for state in self.facility_states() {
            let guard = state.read().await;
            if guard.facility.is_active {
                out.push(guard.facility.clone());
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// The facility record whether active or not. Not-found is a normal
    /// outcome, not an error.
    pub async fn find_facility(&self, facility_id: &str) -> Option<Facility> {
        let state = self.get_facility(facility_id)?;
        let guard = state.read().await;
        Some(guard.facility.clone())
    }

    /// The availability resolver: free slots per facility for one calendar
    /// day. With a `facility_id`, reports that facility alone; an unknown or
    /// inactive id yields an empty list. Without one, reports every active
    /// facility in name order.
    pub async fn resolve_availability(
        &self,
        date: NaiveDate,
        facility_id: Option<&str>,
    ) -> Vec<FacilityAvailability> {
        match facility_id {
            Some(id) => {
                let Some(state) = self.get_facility(id) else {
                    return Vec::new();
                };
                let guard = state.read().await;
                if !guard.facility.is_active {
                    return Vec::new();
                }
                vec![FacilityAvailability {
                    facility: guard.facility.clone(),
                    available_slots: free_slots(&guard, date),
                }]
            }
            None => {
                let mut out = Vec::new();
                for state in self.facility_states() {
                    let guard = state.read().await;
                    if !guard.facility.is_active {
                        continue;
                    }
                    out.push(FacilityAvailability {
                        facility: guard.facility.clone(),
                        available_slots: free_slots(&guard, date),
                    });
                }
                out.sort_by(|a, b| a.facility.name.cmp(&b.facility.name));
                out
            }
        }
    }

    /// Bookings across the ledger, optionally filtered by day and facility,
    /// sorted by date then slot ascending. Includes cancelled history.
    pub async fn list_bookings(
        &self,
        date: Option<NaiveDate>,
        facility_id: Option<&str>,
    ) -> Vec<Booking> {
        let states = match facility_id {
            Some(id) => self.get_facility(id).into_iter().collect(),
            None => self.facility_states(),
        };

        let mut out = Vec::new();
        for state in states {
            let guard = state.read().await;
            out.extend(
                guard
                    .bookings
                    .iter()
                    .filter(|b| date.is_none_or(|d| b.date == d))
                    .cloned(),
            );
        }
        out.sort_by(|a, b| {
            (a.date, a.slot, a.created_at).cmp(&(b.date, b.slot, b.created_at))
        });
        out
    }

    pub async fn find_booking(&self, booking_id: &Ulid) -> Option<Booking> {
        let facility_id = self.facility_for_booking(booking_id)?;
        let state = self.get_facility(&facility_id)?;
        let guard = state.read().await;
        guard.booking(booking_id).cloned()
    }
}
