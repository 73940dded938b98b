//! Millisecond clock that never hands out the same tick twice.
//!
//! Record ids and attachment filenames are both derived from the current
//! millisecond. A plain wall clock gives two requests landing in the same
//! millisecond the same value, so every reading here is forced strictly past
//! the previous one.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Next tick in Unix milliseconds: the wall clock, or one past the
    /// previous tick if the wall clock has not moved on.
    pub fn next_millis(&self) -> i64 {
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = Utc::now().timestamp_millis().max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    /// Next tick as a UTC instant.
    pub fn next_instant(&self) -> DateTime<Utc> {
        let millis = self.next_millis();
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    /// Make sure no future tick is at or below `millis`. Used at startup so
    /// ids stay unique against records written by an earlier process.
    pub fn observe(&self, millis: i64) {
        self.last.fetch_max(millis, Ordering::AcqRel);
    }
}

/// Lowercase base-36 rendering of a non-negative millisecond value.
pub fn encode_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Inverse of [`encode_base36`]; `None` for anything that is not base-36.
pub fn decode_base36(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}

/// Record id for a tick: the tick's millis in base 36.
pub fn id_from_millis(millis: i64) -> String {
    encode_base36(millis.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_strictly_increase() {
        let clock = MonotonicClock::new();
        let mut prev = clock.next_millis();
        for _ in 0..1000 {
            let next = clock.next_millis();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_observe_pushes_clock_forward() {
        let clock = MonotonicClock::new();
        let far_future = Utc::now().timestamp_millis() + 60_000;
        clock.observe(far_future);
        assert_eq!(clock.next_millis(), far_future + 1);
    }

    #[test]
    fn test_base36_matches_known_values() {
        assert_eq!(encode_base36(0), "0");
        assert_eq!(encode_base36(35), "z");
        assert_eq!(encode_base36(36), "10");
        assert_eq!(encode_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn test_base36_decode() {
        assert_eq!(decode_base36("loyw3v28"), Some(1_700_000_000_000));
        assert_eq!(decode_base36(""), None);
        assert_eq!(decode_base36("not-an-id"), None);
    }

    #[test]
    fn test_next_instant_matches_millis_precision() {
        let clock = MonotonicClock::new();
        let instant = clock.next_instant();
        assert_eq!(instant.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
