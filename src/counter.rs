//! The invoice-number allocator.
//!
//! The counter is the only shared mutable state in the application. It lives
//! in a remote document store behind [`CounterStore`]; the allocator keeps
//! the in-memory copy read at startup and writes through on every mutation.
//! Concurrent instances sharing one store race last-write-wins; that is an
//! accepted limitation of a single-operator tool, not something handled here.

use crate::error::StoreError;

/// Value adopted (and persisted) the first time the store comes up empty.
pub const COUNTER_SEED: i64 = 2501;

/// The two operations the remote document store must offer for the counter
/// record. Implemented by [`FirestoreStore`](crate::store::FirestoreStore) in
/// production and by an in-memory fake in tests.
#[allow(async_fn_in_trait)]
pub trait CounterStore {
    async fn get(&self) -> Result<Option<i64>, StoreError>;
    async fn set(&self, value: i64) -> Result<(), StoreError>;
}

/// Owns the persisted invoice-number sequence.
#[derive(Debug)]
pub struct CounterAllocator<S> {
    store: S,
    current: i64,
}

impl<S: CounterStore> CounterAllocator<S> {
    /// Reads the persisted counter. An absent record is initialized to
    /// [`COUNTER_SEED`] and written back, so a second load observes the same
    /// value. A store failure here blocks all document generation.
    pub async fn load(store: S) -> Result<Self, StoreError> {
        let current = match store.get().await? {
            Some(value) => value,
            None => {
                store.set(COUNTER_SEED).await?;
                tracing::info!(seed = COUNTER_SEED, "initialized invoice counter");
                COUNTER_SEED
            }
        };
        Ok(Self { store, current })
    }

    /// The number the next emitted document will carry.
    pub fn current(&self) -> i64 {
        self.current
    }

    /// Persists `current + 1` and returns the new value.
    ///
    /// Call exactly once per confirmed emission or share: never on a failed
    /// or cancelled export (numbers would be skipped), never twice for one
    /// emission (numbers would collide on retry).
    pub async fn advance(&mut self) -> Result<i64, StoreError> {
        let next = self.current + 1;
        self.store.set(next).await?;
        self.current = next;
        tracing::debug!(number = next, "advanced invoice counter");
        Ok(next)
    }

    /// Operator escape hatch: persists `value` verbatim, overriding the
    /// sequence. Intentionally breaks monotonicity.
    pub async fn set_manual(&mut self, value: i64) -> Result<(), StoreError> {
        self.store.set(value).await?;
        self.current = value;
        tracing::info!(number = value, "invoice counter manually overridden");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryStore;

    #[tokio::test]
    async fn absent_counter_is_seeded_and_persisted() {
        let store = MemoryStore::empty();
        let handle = store.clone();

        let allocator = CounterAllocator::load(store).await.unwrap();
        assert_eq!(allocator.current(), COUNTER_SEED);
        assert_eq!(handle.persisted(), Some(COUNTER_SEED));

        // Idempotent: a second load reads the value written by the first.
        let again = CounterAllocator::load(handle.clone()).await.unwrap();
        assert_eq!(again.current(), COUNTER_SEED);
        assert_eq!(handle.writes(), 1);
    }

    #[tokio::test]
    async fn advance_persists_exactly_plus_one() {
        let store = MemoryStore::with_value(2510);
        let handle = store.clone();

        let mut allocator = CounterAllocator::load(store).await.unwrap();
        assert_eq!(allocator.advance().await.unwrap(), 2511);
        assert_eq!(allocator.current(), 2511);
        assert_eq!(handle.persisted(), Some(2511));
        assert_eq!(handle.writes(), 1);
    }

    #[tokio::test]
    async fn manual_override_replaces_the_sequence() {
        let store = MemoryStore::with_value(2510);
        let handle = store.clone();

        let mut allocator = CounterAllocator::load(store).await.unwrap();
        allocator.set_manual(100).await.unwrap();
        assert_eq!(allocator.current(), 100);
        assert_eq!(handle.persisted(), Some(100));

        assert_eq!(allocator.advance().await.unwrap(), 101);
        assert_eq!(handle.persisted(), Some(101));
    }

    #[tokio::test]
    async fn store_failures_surface_and_leave_current_untouched() {
        let store = MemoryStore::with_value(2510);
        let handle = store.clone();

        let mut allocator = CounterAllocator::load(store).await.unwrap();
        handle.fail_writes(true);

        assert!(allocator.advance().await.is_err());
        assert_eq!(allocator.current(), 2510);
        assert_eq!(handle.persisted(), Some(2510));
    }

    #[tokio::test]
    async fn unreachable_store_blocks_loading() {
        let store = MemoryStore::empty();
        store.fail_reads(true);
        assert!(CounterAllocator::load(store).await.is_err());
    }
}
