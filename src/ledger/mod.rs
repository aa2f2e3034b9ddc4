mod availability;
mod error;
mod mutations;
mod queries;

pub use availability::{booked_slots, free_slots};
pub use error::LedgerError;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::journal::Journal;
use crate::model::*;

pub type SharedFacilityState = Arc<RwLock<FacilityState>>;

// ── Group-commit journal channel ─────────────────────────────────

pub(super) enum JournalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Rewrite {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    EntriesSinceRewrite {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the journal and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single commit_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            JournalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(JournalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut journal, &mut batch);
                            handle_non_append(&mut journal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut journal, &mut batch);
                }
            }
            other => handle_non_append(&mut journal, other),
        }
    }
}

fn flush_and_respond(
    journal: &mut Journal,
    batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>,
) {
    metrics::histogram!(crate::observability::JOURNAL_FLUSH_BATCH_SIZE)
        .record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(journal, batch);
    metrics::histogram!(crate::observability::JOURNAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(
    journal: &mut Journal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = journal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = journal.commit_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(journal: &mut Journal, cmd: JournalCommand) {
    match cmd {
        JournalCommand::Rewrite { events, response } => {
            let result = Journal::write_rewrite_file(journal.path(), &events)
                .and_then(|()| journal.install_rewrite());
            let _ = response.send(result);
        }
        JournalCommand::EntriesSinceRewrite { response } => {
            let _ = response.send(journal.entries_since_rewrite());
        }
        JournalCommand::Append { .. } => unreachable!(),
    }
}

// ── Ledger ───────────────────────────────────────────────────────

/// The booking ledger: facility directory plus per-facility booking history,
/// journal-backed. Each facility's state sits behind its own `RwLock`, and
/// the booking writer holds that write lock across conflict check and
/// journal append — the serialized critical section that keeps a slot from
/// being double-booked.
pub struct Ledger {
    pub(super) facilities: DashMap<String, SharedFacilityState>,
    pub(super) journal_tx: mpsc::Sender<JournalCommand>,
    /// Reverse lookup: booking id → facility id.
    pub(super) booking_index: DashMap<Ulid, String>,
}

/// Apply an event directly to a FacilityState (no locking — caller holds the
/// lock). Facility creation is handled at the DashMap level, not here.
fn apply_to_facility(state: &mut FacilityState, event: &Event, index: &DashMap<Ulid, String>) {
    match event {
        Event::FacilityUpserted { facility } => {
            state.facility = facility.clone();
        }
        Event::FacilityDeactivated { at, .. } => {
            state.facility.is_active = false;
            state.facility.updated_at = *at;
        }
        Event::BookingRecorded { booking } => {
            index.insert(booking.id, booking.facility_id.clone());
            state.bookings.push(booking.clone());
        }
        Event::BookingCancelled { booking_id, at, .. } => {
            if let Some(b) = state.booking_mut(booking_id) {
                b.status = BookingStatus::Cancelled;
                b.updated_at = *at;
            }
        }
    }
}

impl Ledger {
    pub fn new(journal_path: PathBuf) -> io::Result<Self> {
        let events = Journal::replay(&journal_path)?;
        let journal = Journal::open(&journal_path)?;
        let (journal_tx, journal_rx) = mpsc::channel(4096);
        tokio::spawn(journal_writer_loop(journal, journal_rx));

        let ledger = Self {
            facilities: DashMap::new(),
            journal_tx,
            booking_index: DashMap::new(),
        };

        // Replay events — we're the sole owner of these Arcs, so try_write
        // always succeeds instantly (no contention). Never block here because
        // this may run inside an async context.
        for event in &events {
            match event {
                Event::FacilityUpserted { facility } => {
                    if let Some(entry) = ledger.facilities.get(&facility.facility_id) {
                        let state = entry.value().clone();
                        drop(entry);
                        let mut guard = state.try_write().expect("replay: uncontended write");
                        apply_to_facility(&mut guard, event, &ledger.booking_index);
                    } else {
                        ledger.facilities.insert(
                            facility.facility_id.clone(),
                            Arc::new(RwLock::new(FacilityState::new(facility.clone()))),
                        );
                    }
                }
                Event::FacilityDeactivated { facility_id, .. } => {
                    if let Some(entry) = ledger.facilities.get(facility_id) {
                        let state = entry.value().clone();
                        drop(entry);
                        let mut guard = state.try_write().expect("replay: uncontended write");
                        apply_to_facility(&mut guard, event, &ledger.booking_index);
                    }
                }
                Event::BookingRecorded {
                    booking: Booking { facility_id, .. },
                }
                | Event::BookingCancelled { facility_id, .. } => {
                    if let Some(entry) = ledger.facilities.get(facility_id) {
                        let state = entry.value().clone();
                        drop(entry);
                        let mut guard = state.try_write().expect("replay: uncontended write");
                        apply_to_facility(&mut guard, event, &ledger.booking_index);
                    }
                }
            }
        }

        Ok(ledger)
    }

    /// Write an event to the journal via the background group-commit writer.
    pub(super) async fn journal_append(&self, event: &Event) -> Result<(), LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| LedgerError::Journal("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| LedgerError::Journal("journal writer dropped response".into()))?
            .map_err(|e| LedgerError::Journal(e.to_string()))
    }

    pub fn get_facility(&self, facility_id: &str) -> Option<SharedFacilityState> {
        self.facilities.get(facility_id).map(|e| e.value().clone())
    }

    pub fn facility_for_booking(&self, booking_id: &Ulid) -> Option<String> {
        self.booking_index.get(booking_id).map(|e| e.value().clone())
    }

    /// Journal-append + apply in one call, under the caller's write lock.
    pub(super) async fn persist_and_apply(
        &self,
        state: &mut FacilityState,
        event: &Event,
    ) -> Result<(), LedgerError> {
        self.journal_append(event).await?;
        apply_to_facility(state, event, &self.booking_index);
        Ok(())
    }

    /// Lookup booking → facility, get facility, acquire write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &Ulid,
    ) -> Result<tokio::sync::OwnedRwLockWriteGuard<FacilityState>, LedgerError> {
        let facility_id = self
            .facility_for_booking(booking_id)
            .ok_or(LedgerError::BookingNotFound(*booking_id))?;
        let state = self
            .get_facility(&facility_id)
            .ok_or(LedgerError::FacilityNotFound(facility_id))?;
        Ok(state.write_owned().await)
    }

    /// Rewrite the journal with only the events needed to recreate the
    /// current state: one upsert per facility, one record per booking
    /// (bookings carry their status, so cancelled history survives).
    pub async fn compact_journal(&self) -> Result<(), LedgerError> {
        let states: Vec<SharedFacilityState> = self
            .facilities
            .iter()
            .map(|e| e.value().clone())
            .collect();

        let mut events = Vec::new();
        for state in states {
            let guard = state.read().await;
            events.push(Event::FacilityUpserted {
                facility: guard.facility.clone(),
            });
            for booking in &guard.bookings {
                events.push(Event::BookingRecorded {
                    booking: booking.clone(),
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Rewrite {
                events,
                response: tx,
            })
            .await
            .map_err(|_| LedgerError::Journal("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| LedgerError::Journal("journal writer dropped response".into()))?
            .map_err(|e| LedgerError::Journal(e.to_string()))
    }

    pub async fn journal_entries_since_rewrite(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .journal_tx
            .send(JournalCommand::EntriesSinceRewrite { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
