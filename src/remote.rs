use crate::storage::DocumentStore;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handle to a spawned merge-update. Dropping it detaches the write; tests
/// await it to observe completion.
#[derive(Debug)]
pub struct PendingWrite(JoinHandle<()>);

impl PendingWrite {
    pub async fn finished(self) {
        if let Err(err) = self.0.await {
            error!("remote write task panicked: {err}");
        }
    }
}

/// Issues a merge-update without waiting for it. Failures are logged and
/// otherwise dropped: no retry, no rollback.
pub fn spawn_merge(store: Arc<dyn DocumentStore>, path: String, patch: Value) -> PendingWrite {
    PendingWrite(tokio::spawn(async move {
        match store.merge(&path, patch).await {
            Ok(()) => debug!(%path, "remote merge applied"),
            Err(err) => error!(%path, "remote merge failed: {err}"),
        }
    }))
}
