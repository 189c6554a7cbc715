use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug)]
struct LockEntry {
    lock: Arc<Mutex<()>>,
    last_used: Instant,
}

/// One async mutex per draft.  Every orchestration procedure on a draft holds
/// its guard for the whole procedure.
#[derive(Clone, Default)]
pub struct DraftLocks {
    entries: Arc<Mutex<HashMap<Uuid, LockEntry>>>,
}

impl DraftLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, draft_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().await;
            let entry = entries.entry(draft_id).or_insert_with(|| LockEntry {
                lock: Arc::new(Mutex::new(())),
                last_used: Instant::now(),
            });
            entry.last_used = Instant::now();
            entry.lock.clone()
        };
        lock.lock_owned().await
    }

    /// Drop locks idle for at least `max_idle_secs` that nobody holds or
    /// waits on.
    pub async fn purge_stale(&self, max_idle_secs: f64) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, entry| {
            Arc::strong_count(&entry.lock) > 1
                || now.duration_since(entry.last_used).as_secs_f64() < max_idle_secs
        });
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
