//! Hard input limits. Requests exceeding these are rejected up front.

pub const MAX_FACILITY_ID_LEN: usize = 64;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_PHONE_LEN: usize = 32;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_NOTES_LEN: usize = 1024;

pub const MAX_FACILITIES: usize = 1024;
pub const MAX_BOOKINGS_PER_FACILITY: usize = 100_000;

/// Duration is minutes of ice time; a day is the ceiling.
pub const MAX_DURATION_MIN: u32 = 24 * 60;

pub const MAX_TOOL_CALLS_PER_BATCH: usize = 16;
