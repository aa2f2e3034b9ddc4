use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only clock type.
pub type Ms = i64;

pub fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as Ms
}

// ── Slot catalog ─────────────────────────────────────────────────

pub const FIRST_SLOT_HOUR: u8 = 6;
pub const LAST_SLOT_HOUR: u8 = 22;
pub const SLOT_COUNT: usize = (LAST_SLOT_HOUR - FIRST_SLOT_HOUR + 1) as usize;

/// One bookable hour of the day. Only catalog members are representable,
/// so a `Slot` that exists is a valid one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u8);

impl Slot {
    pub fn from_hour(hour: u8) -> Option<Self> {
        (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
            .contains(&hour)
            .then_some(Self(hour))
    }

    pub fn hour(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSlot(pub String);

impl std::fmt::Display for InvalidSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid time slot: {:?}", self.0)
    }
}

impl std::error::Error for InvalidSlot {}

impl std::str::FromStr for Slot {
    type Err = InvalidSlot;

    /// Accepts exactly the catalog spelling: zero-padded `"HH:00"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reject = || InvalidSlot(s.to_string());
        let (hour, minute) = s.split_once(':').ok_or_else(reject)?;
        if minute != "00" || hour.len() != 2 {
            return Err(reject());
        }
        let hour: u8 = hour.parse().map_err(|_| reject())?;
        Slot::from_hour(hour).ok_or_else(reject)
    }
}

impl Serialize for Slot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The fixed hourly catalog, 06:00 through 22:00 inclusive. Identical for
/// every facility.
pub fn all_slots() -> Vec<Slot> {
    (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR).map(Slot).collect()
}

// ── Bookings ─────────────────────────────────────────────────────

pub const DEFAULT_DURATION_MIN: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Pending and confirmed bookings hold their slot; cancelled ones don't.
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    #[default]
    IceTime,
    Lesson,
    TeamEvent,
    Practice,
    Game,
}

impl BookingType {
    /// Caller-supplied type, falling back to the default on anything unknown.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s {
            Some("ice_time") => Self::IceTime,
            Some("lesson") => Self::Lesson,
            Some("team_event") => Self::TeamEvent,
            Some("practice") => Self::Practice,
            Some("game") => Self::Game,
            _ => Self::default(),
        }
    }
}

/// Who the booking is for. Input-side value; bookings store the fields flat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Ulid,
    pub facility_id: String,
    /// Timezone-naive calendar day. Never converted between timezones.
    pub date: NaiveDate,
    #[serde(rename = "timeSlot")]
    pub slot: Slot,
    #[serde(rename = "duration")]
    pub duration_min: u32,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub booking_type: BookingType,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: Ms,
    pub updated_at: Ms,
}

impl Booking {
    /// True if this booking currently holds (date, slot).
    pub fn blocks(&self, date: NaiveDate, slot: Slot) -> bool {
        self.status.blocks_slot() && self.date == date && self.slot == slot
    }
}

/// Input to the booking writer.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub facility_id: String,
    pub date: NaiveDate,
    pub slot: Slot,
    pub customer: Customer,
    pub booking_type: BookingType,
    /// Minutes; defaults to [`DEFAULT_DURATION_MIN`] when absent.
    pub duration_min: Option<u32>,
    pub notes: Option<String>,
}

// ── Facilities ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub facility_id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: Ms,
    pub updated_at: Ms,
}

impl Facility {
    /// One-line postal address for confirmations and voice playback.
    pub fn display_address(&self) -> String {
        format!(
            "{}, {} {} {}",
            self.address, self.city, self.province, self.postal_code
        )
    }
}

/// Per-facility ledger shard: the facility record plus its full booking
/// history. Cancellations flip status in place; nothing is ever removed.
#[derive(Debug, Clone)]
pub struct FacilityState {
    pub facility: Facility,
    pub bookings: Vec<Booking>,
}

impl FacilityState {
    pub fn new(facility: Facility) -> Self {
        Self {
            facility,
            bookings: Vec::new(),
        }
    }

    pub fn booking(&self, id: &Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == *id)
    }

    pub fn booking_mut(&mut self, id: &Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == *id)
    }

    /// The booking currently holding (date, slot), if any.
    pub fn slot_holder(&self, date: NaiveDate, slot: Slot) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.blocks(date, slot))
    }
}

// ── Ledger events ────────────────────────────────────────────────

/// The event types — flat, no nesting. This is the journal record format.
/// `BookingRecorded` carries the whole booking (including status) so a
/// journal rewrite can re-emit cancelled history verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    FacilityUpserted {
        facility: Facility,
    },
    FacilityDeactivated {
        facility_id: String,
        at: Ms,
    },
    BookingRecorded {
        booking: Booking,
    },
    BookingCancelled {
        booking_id: Ulid,
        facility_id: String,
        at: Ms,
    },
}

// ── Query result types ───────────────────────────────────────────

/// Resolver output for one facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityAvailability {
    pub facility: Facility,
    pub available_slots: Vec<Slot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_parse_and_display() {
        let s: Slot = "06:00".parse().unwrap();
        assert_eq!(s.hour(), 6);
        assert_eq!(s.to_string(), "06:00");

        let s: Slot = "22:00".parse().unwrap();
        assert_eq!(s.to_string(), "22:00");
    }

    #[test]
    fn slot_rejects_non_catalog_values() {
        for bad in ["05:00", "23:00", "14:30", "6:00", "1400", "", "noon"] {
            assert!(bad.parse::<Slot>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn slot_catalog_is_ordered() {
        let slots = all_slots();
        assert_eq!(slots.len(), SLOT_COUNT);
        assert_eq!(slots.first().unwrap().to_string(), "06:00");
        assert_eq!(slots.last().unwrap().to_string(), "22:00");
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn slot_serde_roundtrip() {
        let slot: Slot = "14:00".parse().unwrap();
        let json = serde_json::to_string(&slot).unwrap();
        assert_eq!(json, "\"14:00\"");
        let back: Slot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slot);

        assert!(serde_json::from_str::<Slot>("\"03:00\"").is_err());
    }

    #[test]
    fn booking_type_falls_back_to_default() {
        assert_eq!(
            BookingType::parse_or_default(Some("practice")),
            BookingType::Practice
        );
        assert_eq!(
            BookingType::parse_or_default(Some("team_event")),
            BookingType::TeamEvent
        );
        assert_eq!(
            BookingType::parse_or_default(Some("figure_skating")),
            BookingType::IceTime
        );
        assert_eq!(BookingType::parse_or_default(None), BookingType::IceTime);
    }

    #[test]
    fn status_blocks_slot() {
        assert!(BookingStatus::Pending.blocks_slot());
        assert!(BookingStatus::Confirmed.blocks_slot());
        assert!(!BookingStatus::Cancelled.blocks_slot());
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

    #[test]
    fn booking_blocks_only_its_own_triple() {
        let b = booking("2025-06-10", "14:00", BookingStatus::Confirmed);
        let date: NaiveDate = "2025-06-10".parse().unwrap();
        let other_date: NaiveDate = "2025-06-11".parse().unwrap();
        assert!(b.blocks(date, "14:00".parse().unwrap()));
        assert!(!b.blocks(date, "15:00".parse().unwrap()));
        assert!(!b.blocks(other_date, "14:00".parse().unwrap()));
    }

    #[test]
    fn cancelled_booking_blocks_nothing() {
        let b = booking("2025-06-10", "14:00", BookingStatus::Cancelled);
        assert!(!b.blocks("2025-06-10".parse().unwrap(), "14:00".parse().unwrap()));
    }

    #[test]
    fn slot_holder_skips_cancelled() {
        let facility = Facility {
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
        };
        let mut state = FacilityState::new(facility);
        state
            .bookings
            .push(booking("2025-06-10", "14:00", BookingStatus::Cancelled));
        let date: NaiveDate = "2025-06-10".parse().unwrap();
        assert!(state.slot_holder(date, "14:00".parse().unwrap()).is_none());

        state
            .bookings
            .push(booking("2025-06-10", "14:00", BookingStatus::Confirmed));
        let holder = state.slot_holder(date, "14:00".parse().unwrap()).unwrap();
        assert_eq!(holder.status, BookingStatus::Confirmed);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::BookingRecorded {
            booking: booking("2025-06-10", "14:00", BookingStatus::Confirmed),
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn display_address_reads_naturally() {
        let f = Facility {
            facility_id: "minto-barrhaven".into(),
            name: "Minto Recreation Complex - Barrhaven".into(),
            address: "3500 Cambrian Rd".into(),
            city: "Nepean".into(),
            province: "ON".into(),
            postal_code: "K2J 0V1".into(),
            phone: Some("(613) 580-2424".into()),
            is_active: true,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(f.display_address(), "3500 Cambrian Rd, Nepean ON K2J 0V1");
    }
}
