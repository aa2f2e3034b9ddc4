use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use ulid::Ulid;

use icetime::ledger::{Ledger, LedgerError};
use icetime::model::{BookingRequest, BookingType, Customer, Facility, all_slots};

const DAYS: u64 = 30;
const RINKS: usize = 10;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn rink(i: usize) -> Facility {
    Facility {
        facility_id: format!("rink-{i}"),
        name: format!("Stress Rink {i}"),
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

fn request(facility_id: String, date: NaiveDate, slot: icetime::model::Slot) -> BookingRequest {
    BookingRequest {
        facility_id,
        date,
        slot,
        customer: Customer {
            name: "Stress Tester".into(),
            phone: "613-555-0000".into(),
            email: None,
        },
        booking_type: BookingType::IceTime,
        duration_min: None,
        notes: None,
    }
}

#[tokio::main]
async fn main() {
    let dir = std::env::temp_dir().join(format!("icetime_bench_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let ledger = Arc::new(Ledger::new(dir.join("ledger.journal")).unwrap());

    println!("icetime stress bench ({RINKS} rinks, {DAYS} days)");

    for i in 0..RINKS {
        ledger.upsert_facility(rink(i)).await.unwrap();
    }

    let first_day: NaiveDate = "2025-06-01".parse().unwrap();

    // Phase 1: fill every slot on every rink for DAYS days, concurrently.
    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..RINKS {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for day in 0..DAYS {
                let date = first_day + chrono::Days::new(day);
                for slot in all_slots() {
                    let t = Instant::now();
                    ledger
                        .book(request(format!("rink-{i}"), date, slot))
                        .await
                        .unwrap();
                    latencies.push(t.elapsed());
                }
            }
            latencies
        }));
    }
    let mut book_latencies = Vec::new();
    for handle in handles {
        book_latencies.extend(handle.await.unwrap());
    }
    let booked = book_latencies.len();
    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "  filled {booked} slots in {elapsed:.2}s ({:.0} bookings/s)",
        booked as f64 / elapsed
    );
    print_latency("book", &mut book_latencies);

    // Phase 2: contended writes — every task wants the same slot.
    let contended_date = first_day + chrono::Days::new(DAYS + 1);
    let mut handles = Vec::new();
    for _ in 0..64 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .book(request(
                    "rink-0".into(),
                    contended_date,
                    all_slots()[0],
                ))
                .await
        }));
    }
    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(LedgerError::SlotTaken { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    println!("  contended slot: {winners} winner, {conflicts} conflicts");
    assert_eq!(winners, 1);

    // Phase 3: availability reads over the fully booked window.
    let mut read_latencies = Vec::new();
    for day in 0..DAYS {
        let date = first_day + chrono::Days::new(day);
        let t = Instant::now();
        let availability = ledger.resolve_availability(date, None).await;
        read_latencies.push(t.elapsed());
        assert_eq!(availability.len(), RINKS);
        assert!(availability.iter().all(|a| a.available_slots.is_empty()));
    }
    print_latency("resolve_availability", &mut read_latencies);

    let _ = std::fs::remove_dir_all(&dir);
}
