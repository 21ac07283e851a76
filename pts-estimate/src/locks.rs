use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type Entries = HashMap<Uuid, Arc<AsyncMutex<()>>>;

/// One async mutex per estimate, so that concurrent point mutations of the
/// same scale run one after the other.
///
/// An entry lives only while someone holds or waits for it; the last
/// [`EstimateGuard`] to drop removes it.
#[derive(Clone, Default)]
pub struct EstimateLocks {
    entries: Arc<Mutex<Entries>>,
}

impl EstimateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder of `estimate_id` remains.
    pub async fn acquire(&self, estimate_id: Uuid) -> EstimateGuard {
        let lock = self.entries().entry(estimate_id).or_default().clone();
        let guard = lock.lock_owned().await;
        EstimateGuard { estimate_id, entries: self.entries.clone(), guard: Some(guard) }
    }

    /// Number of estimates currently held or waited on.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds one estimate's lock until dropped.
pub struct EstimateGuard {
    estimate_id: Uuid,
    entries: Arc<Mutex<Entries>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EstimateGuard {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Releasing gives back this holder's reference; waiters keep their own.
        self.guard.take();
        if entries.get(&self.estimate_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            entries.remove(&self.estimate_id);
        }
    }
}
