//! Built-in facility seed. The directory is the single source of truth;
//! this list only primes an empty one on first boot.

use tracing::info;

use crate::ledger::{Ledger, LedgerError};
use crate::model::{Facility, Ms};

fn rink(
    facility_id: &str,
    name: &str,
    address: &str,
    city: &str,
    postal_code: &str,
    phone: &str,
    now: Ms,
) -> Facility {
    Facility {
        facility_id: facility_id.into(),
        name: name.into(),
        address: address.into(),
        city: city.into(),
        province: "ON".into(),
        postal_code: postal_code.into(),
        phone: Some(phone.into()),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn default_facilities(now: Ms) -> Vec<Facility> {
    vec![
        rink(
            "minto-barrhaven",
            "Minto Recreation Complex - Barrhaven",
            "3500 Cambrian Rd",
            "Nepean",
            "K2J 0V1",
            "(613) 580-2424",
            now,
        ),
        rink(
            "bell-sensplex",
            "Bell Sensplex",
            "1565 Maple Grove Rd",
            "Nepean",
            "K2V 1A3",
            "(613) 599-0680",
            now,
        ),
        rink(
            "walter-baker",
            "Walter Baker Sports Centre",
            "100 Malvern Dr",
            "Nepean",
            "K2J 2G5",
            "(613) 580-2424",
            now,
        ),
        rink(
            "jim-durrell",
            "Jim Durrell Recreation Centre",
            "1265 Walkley Rd",
            "Ottawa",
            "K1V 2P4",
            "(613) 247-4846",
            now,
        ),
    ]
}

/// Upsert the default facilities if the directory is empty. Returns how many
/// were written; zero means an existing directory was left untouched.
pub async fn seed_if_empty(ledger: &Ledger) -> Result<usize, LedgerError> {
    if ledger.facility_count() > 0 {
        return Ok(0);
    }
    let facilities = default_facilities(crate::model::now_ms());
    let count = facilities.len();
    for facility in facilities {
        info!("seeding facility {}", facility.name);
        ledger.upsert_facility(facility).await?;
    }
    Ok(count)
}
