use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::UserId;

/// Serializes relationship mutations per unordered user pair.
/// Slots are dropped again once nobody holds or waits on them.
#[derive(Debug, Default)]
pub struct PairLocks {
    slots: Mutex<HashMap<(UserId, UserId), Arc<Mutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, a: &UserId, b: &UserId) -> OwnedMutexGuard<()> {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };

        let slot = {
            let mut slots = self.slots.lock().await;
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key).or_default().clone()
        };
        slot.lock_owned().await
    }

    pub async fn tracked_pairs(&self) -> usize {
        self.slots.lock().await.len()
    }
}
