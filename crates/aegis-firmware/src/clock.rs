use embedded_sdmmc::{TimeSource, Timestamp};

/// File timestamps for a board without a real-time clock
///
/// Every write is stamped 2025-01-01 00:00:00; nothing on the card depends on
/// modification times.
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 55,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}
