//! In-flight request accounting against a fixed ceiling.
//!
//! The governor hands out RAII permits: acquisition atomically checks the
//! ceiling and increments the counter in one step, and the permit's drop
//! releases the slot on every exit path, including panics and early
//! returns. A rejected acquisition never touches the counter.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use mensa_core::{CoreError, Result};

/// Tracks in-flight requests against a configured ceiling.
#[derive(Debug)]
pub struct CapacityGovernor {
    in_flight: AtomicUsize,
    ceiling: usize,
}

impl CapacityGovernor {
    /// Creates a governor with the given ceiling.
    pub fn new(ceiling: usize) -> Arc<Self> {
        Arc::new(Self { in_flight: AtomicUsize::new(0), ceiling })
    }

    /// Attempts to claim an in-flight slot.
    ///
    /// Succeeds with a permit when the current count is below the
    /// ceiling; fails with a capacity error otherwise, leaving the
    /// counter untouched. The check and increment are a single atomic
    /// operation, so concurrent callers cannot overshoot the ceiling.
    pub fn try_acquire(self: &Arc<Self>) -> Result<CapacityPermit> {
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.ceiling).then_some(n + 1)
            })
            .map(|_| CapacityPermit { governor: Arc::clone(self) })
            .map_err(|current| CoreError::capacity(current, self.ceiling))
    }

    /// Current number of in-flight requests.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Configured ceiling.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }
}

/// RAII guard for one in-flight slot.
///
/// Dropping the permit releases the slot exactly once.
#[derive(Debug)]
pub struct CapacityPermit {
    governor: Arc<CapacityGovernor>,
}

impl Drop for CapacityPermit {
    fn drop(&mut self) {
        self.governor.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permits_acquire_up_to_ceiling() {
        let governor = CapacityGovernor::new(3);

        let permits: Vec<_> = (0..3).map(|_| governor.try_acquire().unwrap()).collect();
        assert_eq!(governor.in_flight(), 3);

        drop(permits);
        assert_eq!(governor.in_flight(), 0);
    }

    #[test]
    fn rejection_at_ceiling_leaves_counter_unchanged() {
        let governor = CapacityGovernor::new(2);
        let _a = governor.try_acquire().unwrap();
        let _b = governor.try_acquire().unwrap();

        let err = governor.try_acquire().unwrap_err();
        assert_eq!(err.code(), "M1003");
        // No increment-then-decrement drift on the rejected path.
        assert_eq!(governor.in_flight(), 2);
    }

    #[test]
    fn slot_frees_after_drop_and_can_be_reacquired() {
        let governor = CapacityGovernor::new(1);

        let permit = governor.try_acquire().unwrap();
        assert!(governor.try_acquire().is_err());

        drop(permit);
        assert_eq!(governor.in_flight(), 0);
        assert!(governor.try_acquire().is_ok());
    }

    #[test]
    fn permit_releases_when_holder_panics() {
        let governor = CapacityGovernor::new(1);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _permit = governor.try_acquire().unwrap();
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert_eq!(governor.in_flight(), 0);
    }
}
