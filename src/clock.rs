// src/clock.rs

// clock module definition and implementations

// dependencies
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Clock trait to abstract time retrieval for the settlement host.
/// Implementors must be thread-safe (Send + Sync).
/// The `now` method returns the current time in nanoseconds as a u64.
/// The local host settles balances against it, so tests can drive time by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<u64, ClockError>;
}

/// Clock error type
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("system time is before the unix epoch")]
    SystemTimeError,
}

/// SystemClock implementation using the system time.
/// Returns the current time in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<u64, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .map_err(|_| ClockError::SystemTimeError)
    }
}
