use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gavel_shared::clients::site::Site;
use gavel_shared::ThingId;

use super::Ledger;

/// Per-cycle cap on removal calls.
pub const DRAIN_LIMIT: usize = 30;

/// FIFO of comments waiting to be removed.
///
/// Everything queued here WILL be removed eventually, so callers check
/// for distinguished comments before adding. Items whose removal fails
/// go back to the tail rather than being dropped.
pub struct NukeLedger {
    site: Arc<dyn Site>,
    queue: Mutex<VecDeque<ThingId>>,
}

impl NukeLedger {
    pub fn new(site: Arc<dyn Site>) -> Self {
        Self {
            site,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn add(&self, id: ThingId) {
        self.queue.lock().unwrap().push_back(id);
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Ledger for NukeLedger {
    async fn flush(&self) {
        let budget = self.len().min(DRAIN_LIMIT);
        for _ in 0..budget {
            let Some(id) = self.queue.lock().unwrap().pop_front() else {
                return;
            };
            if let Err(e) = self.site.remove(&id).await {
                tracing::error!(error = %e, comment = %id, "failed to remove comment");
                self.queue.lock().unwrap().push_back(id);
            }
        }
    }
}
