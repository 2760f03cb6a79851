use crate::cache::{JsonFileCache, LocalCache};
use crate::session::{IdentityProvider, LocalIdentityProvider, SessionRegistry};
use crate::storage::{DocumentStore, JsonDocumentStore};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<dyn LocalCache>,
    pub sessions: Arc<SessionRegistry>,
    pub identity: Arc<dyn IdentityProvider>,
    pub day_locks: Arc<DayLocks>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<dyn LocalCache>) -> Self {
        Self {
            store,
            cache,
            sessions: Arc::new(SessionRegistry::default()),
            identity: Arc::new(LocalIdentityProvider),
            day_locks: Arc::new(DayLocks::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(JsonDocumentStore::in_memory()),
            Arc::new(JsonFileCache::in_memory()),
        )
    }
}

/// One lock per user around the daily view's load, apply and write cycle.
/// A toggle keeps its guard until its remote merge has landed, so the next
/// toggle for that user starts from the state the previous one left.
#[derive(Default)]
pub struct DayLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DayLocks {
    pub async fn acquire(&self, uid: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(uid.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
