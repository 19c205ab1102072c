//! Per-conversation turn locks.
//!
//! A turn holds its conversation's lock from the history read to the final append, so two turns
//! on one conversation run one after the other. Map entries are dropped once nobody holds or
//! waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use dbot_core::ConversationId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<ConversationId, Arc<AsyncMutex<()>>>;

#[derive(Default, Clone)]
pub(crate) struct TurnLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl TurnLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until no other turn of `conversation_id` is running.
    pub(crate) async fn acquire(&self, conversation_id: &ConversationId) -> TurnGuard {
        let lock = {
            let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on; left behind by waiters cancelled after the
            // previous holder released.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(conversation_id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        TurnGuard {
            guard: Some(guard),
            conversation_id: conversation_id.clone(),
            locks: self.locks.clone(),
        }
    }

    /// Number of conversations with a running or waiting turn.
    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub(crate) struct TurnGuard {
    guard: Option<OwnedMutexGuard<()>>,
    conversation_id: ConversationId,
    locks: Arc<Mutex<LockMap>>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only counts the map and waiters.
        self.guard.take();
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = map.get(&self.conversation_id) {
            if Arc::strong_count(lock) == 1 {
                map.remove(&self.conversation_id);
            }
        }
    }
}
