use time::{OffsetDateTime, UtcOffset};

pub trait TimeSource {
    // Return the current instant, in UTC
    fn current_time(&self) -> OffsetDateTime;
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn current_time(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Always returns the same instant, converted to UTC. Used by tests to pin
/// batch keys and timestamps.
#[derive(Clone)]
pub struct FixedTime {
    pub time: OffsetDateTime,
}

impl TimeSource for FixedTime {
    fn current_time(&self) -> OffsetDateTime {
        self.time.to_offset(UtcOffset::UTC)
    }
}
