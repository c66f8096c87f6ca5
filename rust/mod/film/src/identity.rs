use std::sync::Mutex;

/// Id source for the key-value backends, which have no sequence of their own.
///
/// Each call returns one more than the largest id the allocator has seen,
/// starting from the ids already present in the store. It is a single-writer
/// device: the caller must hold the repository's write lock across
/// `next_id` and the write that uses the id.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    high: Mutex<i64>,
}

impl IdentityAllocator {
    /// Start above the largest of `existing` (or at 1 for an empty store).
    pub fn seeded<I: IntoIterator<Item = i64>>(existing: I) -> Self {
        Self {
            high: Mutex::new(next_after(existing) - 1),
        }
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> i64 {
        let mut high = self.high.lock().unwrap_or_else(|e| e.into_inner());
        *high += 1;
        *high
    }
}

/// `max(existing) + 1`, or 1 when nothing exists yet.
pub fn next_after<I: IntoIterator<Item = i64>>(existing: I) -> i64 {
    existing.into_iter().max().unwrap_or(0).max(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_starts_at_one() {
        assert_eq!(IdentityAllocator::default().next_id(), 1);
        assert_eq!(next_after(Vec::new()), 1);
    }

    #[test]
    fn continues_after_existing_max() {
        let ids = IdentityAllocator::seeded([3, 9, 4]);
        assert_eq!(ids.next_id(), 10);
        assert_eq!(ids.next_id(), 11);
        assert_eq!(next_after([3, 9, 4]), 10);
    }

    #[test]
    fn gaps_are_not_reused() {
        // Deleting id 9 leaves the allocator above it.
        let ids = IdentityAllocator::seeded([1, 2, 9]);
        assert_eq!(ids.next_id(), 10);
    }

    #[test]
    fn negative_ids_are_ignored() {
        assert_eq!(next_after([-5]), 1);
    }
}
