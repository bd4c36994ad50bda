//! Clock Module
//!
//! Wall-clock abstraction so expiration can be tested without sleeping.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

// == Clock Trait ==
/// Source of the current UTC instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

// == System Clock ==
/// Real wall clock, used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// == Mock Clock ==
/// Manually driven clock for deterministic tests.
///
/// Clones share the same underlying instant, so a test can hand one clone
/// to the cache and keep another to advance time.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Creates a mock clock frozen at the current real time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Creates a mock clock frozen at `instant`.
    pub fn starting_at(instant: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(instant)),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.lock() += by;
    }

    /// Jumps the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.lock() = instant;
    }

    // A panic elsewhere cannot leave the instant half-written
    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_tracks_real_time() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }

    #[test]
    fn test_mock_clock_is_frozen() {
        let clock = MockClock::new();
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(clock.now(), first);
    }

    #[test]
    fn test_mock_clock_advance_shared_between_clones() {
        let clock = MockClock::new();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance(Duration::minutes(16));

        assert_eq!(clock.now() - start, Duration::minutes(16));
    }

    #[test]
    fn test_mock_clock_set() {
        let clock = MockClock::new();
        let target = DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn test_mock_clock_survives_poisoned_lock() {
        let clock = MockClock::new();
        let start = clock.now();

        let handle = clock.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = handle.current.lock().unwrap();
            panic!("test thread panics while holding the clock");
        })
        .join();
        assert!(panicked.is_err());

        clock.advance(Duration::seconds(1));
        assert_eq!(clock.now() - start, Duration::seconds(1));
    }

    #[test]
    fn test_arc_clock_delegates() {
        let clock = MockClock::new();
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        clock.advance(Duration::seconds(3));
        assert_eq!(shared.now(), clock.now());
    }
}
