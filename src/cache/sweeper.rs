//! Periodic purge of expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::store::Expiring;

/// Holds every store constructed at startup and purges them on a timer.
pub struct ExpirySweeper {
    interval: Duration,
    stores: Vec<Arc<dyn Expiring>>,
}

impl ExpirySweeper {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stores: Vec::new(),
        }
    }

    pub fn register(&mut self, store: Arc<dyn Expiring>) {
        self.stores.push(store);
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Purge every registered store once.
    pub fn sweep(&self) -> usize {
        let mut purged = 0;
        for store in &self.stores {
            let removed = store.purge_expired();
            if removed > 0 {
                debug!(store = store.name(), removed, "Purged expired cache entries");
            }
            purged += removed;
        }
        purged
    }

    /// Run [`sweep`](Self::sweep) on every interval tick until aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                self.sweep();
            }
        })
    }
}
