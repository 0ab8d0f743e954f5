//! Process-wide command identifiers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time-based identifier sequence.
///
/// Each id is the current wall-clock millisecond, bumped past the previous
/// id when the clock has not advanced (or went backwards), so ids are
/// strictly increasing within a process.
#[derive(Debug, Default)]
pub struct CommandIds {
    last: AtomicU64,
}

impl CommandIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = now_millis();
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
