use std::fmt::Debug;

/// Source of the current time in epoch seconds.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Epoch seconds are never negative on a sane host
        chrono::Utc::now().timestamp().max(0) as u64
    }
}
