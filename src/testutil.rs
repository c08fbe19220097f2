//! In-memory substitutes for the remote store and the export facility, so
//! the allocator and emission flow are testable without a network.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::counter::CounterStore;
use crate::error::{ExportError, StoreError};
use crate::export::ExportTarget;

/// Shared-cell counter store; clones observe the same persisted value.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    value: Arc<Mutex<Option<i64>>>,
    writes: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn empty() -> Self {
        Self {
            value: Arc::new(Mutex::new(None)),
            writes: Arc::new(AtomicUsize::new(0)),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_value(value: i64) -> Self {
        let store = Self::empty();
        *store.value.lock().unwrap() = Some(value);
        store
    }

    pub fn persisted(&self) -> Option<i64> {
        *self.value.lock().unwrap()
    }

    /// Number of successful writes since construction.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl CounterStore for MemoryStore {
    async fn get(&self) -> Result<Option<i64>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unexpected("simulated read failure".to_string()));
        }
        Ok(*self.value.lock().unwrap())
    }

    async fn set(&self, value: i64) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unexpected("simulated write failure".to_string()));
        }
        *self.value.lock().unwrap() = Some(value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Export target that records deliveries, or fails every one of them.
#[derive(Debug)]
pub struct MemoryExport {
    fail: bool,
    delivered: Vec<(String, Vec<u8>)>,
}

impl MemoryExport {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            delivered: Vec::new(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            delivered: Vec::new(),
        }
    }

    pub fn deliveries(&self) -> usize {
        self.delivered.len()
    }

    pub fn last_bytes(&self) -> Option<&[u8]> {
        self.delivered.last().map(|(_, bytes)| bytes.as_slice())
    }
}

impl ExportTarget for MemoryExport {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<(), ExportError> {
        if self.fail {
            return Err(ExportError::Cancelled);
        }
        self.delivered.push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}
