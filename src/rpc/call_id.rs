//! Call id allocation.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::protocol::NO_CALL_ID;

/// Hands out correlation ids, starting at 1.
///
/// Ids increase monotonically and wrap around at `i32::MAX`; 0 is never
/// returned because it marks frames without a call.
#[derive(Debug)]
pub struct CallIdGenerator {
    next: AtomicI32,
}

impl CallIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Generator whose first id is `first` (or the one after it, if 0).
    pub fn starting_at(first: i32) -> Self {
        Self {
            next: AtomicI32::new(first),
        }
    }

    /// Next id; wraps around and never yields 0.
    pub fn next_id(&self) -> i32 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != NO_CALL_ID {
                return id;
            }
        }
    }
}

impl Default for CallIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_one() {
        let ids = CallIdGenerator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
    }

    #[test]
    fn test_wrap_skips_zero() {
        let ids = CallIdGenerator::starting_at(i32::MAX);
        assert_eq!(ids.next_id(), i32::MAX);
        assert_eq!(ids.next_id(), i32::MIN);

        let ids = CallIdGenerator::starting_at(-1);
        assert_eq!(ids.next_id(), -1);
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn test_unique_across_threads() {
        let ids = Arc::new(CallIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..1000).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 8000);
    }
}
