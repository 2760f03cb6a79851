use crate::errors::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};
use tracing::{debug, error};

/// Path-addressed JSON documents with merge-update semantics.
///
/// Document paths have an even number of `/`-separated segments
/// (`users/{uid}`), collection paths an odd number (`users/{uid}/days`).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> StoreResult<Option<Value>>;

    /// Replaces the whole document.
    async fn set(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Deep-merges `value` into the document, creating it when absent.
    async fn merge(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Direct child documents of a collection as `(id, document)`, sorted by id.
    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>>;
}

pub fn user_doc(uid: &str) -> String {
    format!("users/{uid}")
}

pub fn days_collection(uid: &str) -> String {
    format!("users/{uid}/days")
}

pub fn day_doc(uid: &str, date: NaiveDate) -> String {
    format!("{}/{}", days_collection(uid), crate::habits::date_key(date))
}

fn segments(path: &str) -> StoreResult<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(parts)
}

fn check_document_path(path: &str) -> StoreResult<()> {
    if segments(path)?.len() % 2 != 0 {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Object fields merge key by key; anything else, arrays included, replaces.
pub fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let nested = value.is_object() && existing.get(&key).is_some_and(Value::is_object);
                if nested {
                    if let Some(slot) = existing.get_mut(&key) {
                        deep_merge(slot, value);
                    }
                } else {
                    existing.insert(key, value);
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Document store kept in memory and, when opened on a path, mirrored to a
/// pretty-printed JSON file after every mutation.
pub struct JsonDocumentStore {
    path: Option<PathBuf>,
    docs: Mutex<BTreeMap<String, Value>>,
}

impl JsonDocumentStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            docs: Mutex::new(BTreeMap::new()),
        }
    }

    pub async fn open(path: &Path) -> Self {
        let docs = load_documents(path).await;
        debug!(documents = docs.len(), path = %path.display(), "document store opened");
        Self {
            path: Some(path.to_path_buf()),
            docs: Mutex::new(docs),
        }
    }

    async fn persist(&self, docs: &BTreeMap<String, Value>) -> StoreResult<()> {
        if let Some(path) = &self.path {
            persist_documents(path, docs).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        check_document_path(path)?;
        let docs = self.docs.lock().await;
        Ok(docs.get(path).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> StoreResult<()> {
        check_document_path(path)?;
        if !value.is_object() {
            return Err(StoreError::NotAnObject {
                path: path.to_string(),
            });
        }
        let mut docs = self.docs.lock().await;
        docs.insert(path.to_string(), value);
        self.persist(&docs).await
    }

    async fn merge(&self, path: &str, value: Value) -> StoreResult<()> {
        check_document_path(path)?;
        if !value.is_object() {
            return Err(StoreError::NotAnObject {
                path: path.to_string(),
            });
        }
        let mut docs = self.docs.lock().await;
        let entry = docs
            .entry(path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        deep_merge(entry, value);
        self.persist(&docs).await
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
        if segments(collection)?.len() % 2 != 1 {
            return Err(StoreError::InvalidPath {
                path: collection.to_string(),
            });
        }
        let prefix = format!("{collection}/");
        let docs = self.docs.lock().await;
        Ok(docs
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, value)| {
                let id = &key[prefix.len()..];
                (!id.contains('/')).then(|| (id.to_string(), value.clone()))
            })
            .collect())
    }
}

async fn load_documents(path: &Path) -> BTreeMap<String, Value> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(docs) => docs,
            Err(err) => {
                error!("failed to parse document file: {err}");
                BTreeMap::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(err) => {
            error!("failed to read document file: {err}");
            BTreeMap::new()
        }
    }
}

async fn persist_documents(path: &Path, docs: &BTreeMap<String, Value>) -> StoreResult<()> {
    let payload = serde_json::to_vec_pretty(docs)?;
    fs::write(path, payload).await?;
    Ok(())
}
