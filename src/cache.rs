use crate::errors::StoreResult;
use crate::habits::{HabitId, date_key};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};
use tracing::{error, warn};

/// Per-task checkmarks for one day, aligned with each habit's task list.
pub type DayChecklists = BTreeMap<HabitId, Vec<bool>>;

/// String key/value store local to this process. Entries are grouped by a
/// scope (one per signed-in user) and never expire.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, scope: &str, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, scope: &str, key: &str, value: String) -> StoreResult<()>;
}

type Entries = BTreeMap<String, String>;

/// Cache held in memory and, when opened on a directory, written through to
/// one JSON file per scope.
pub struct JsonFileCache {
    dir: Option<PathBuf>,
    scopes: Mutex<HashMap<String, Entries>>,
}

impl JsonFileCache {
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(dir: &Path) -> Self {
        Self {
            dir: Some(dir.to_path_buf()),
            scopes: Mutex::new(HashMap::new()),
        }
    }

    fn scope_file(&self, scope: &str) -> Option<PathBuf> {
        let name: String = scope
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.as_ref().map(|dir| dir.join(format!("{name}.json")))
    }

    async fn ensure_loaded<'a>(
        &self,
        scopes: &'a mut HashMap<String, Entries>,
        scope: &str,
    ) -> &'a mut Entries {
        if !scopes.contains_key(scope) {
            let entries = match self.scope_file(scope) {
                Some(file) => load_entries(&file).await,
                None => Entries::new(),
            };
            scopes.insert(scope.to_string(), entries);
        }
        scopes.entry(scope.to_string()).or_default()
    }
}

#[async_trait]
impl LocalCache for JsonFileCache {
    async fn get(&self, scope: &str, key: &str) -> StoreResult<Option<String>> {
        let mut scopes = self.scopes.lock().await;
        let entries = self.ensure_loaded(&mut scopes, scope).await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, scope: &str, key: &str, value: String) -> StoreResult<()> {
        let mut scopes = self.scopes.lock().await;
        let entries = self.ensure_loaded(&mut scopes, scope).await;
        entries.insert(key.to_string(), value);
        if let Some(file) = self.scope_file(scope) {
            let payload = serde_json::to_vec_pretty(entries)?;
            fs::write(&file, payload).await?;
        }
        Ok(())
    }
}

async fn load_entries(path: &Path) -> Entries {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(err) => {
                error!("failed to parse cache file {}: {err}", path.display());
                Entries::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Entries::new(),
        Err(err) => {
            error!("failed to read cache file {}: {err}", path.display());
            Entries::new()
        }
    }
}

/// Reads the cached checklists for `date`. A missing, unreadable or
/// malformed entry reads as empty.
pub async fn load_checklists(cache: &dyn LocalCache, scope: &str, date: NaiveDate) -> DayChecklists {
    let key = date_key(date);
    let raw = match cache.get(scope, &key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return DayChecklists::new(),
        Err(err) => {
            error!(%key, "failed to read task cache: {err}");
            return DayChecklists::new();
        }
    };

    let Ok(serde_json::Value::Object(fields)) = serde_json::from_str::<serde_json::Value>(&raw) else {
        warn!(%key, "ignoring malformed task cache entry");
        return DayChecklists::new();
    };

    fields
        .into_iter()
        .filter_map(|(name, value)| {
            let habit = name.parse::<HabitId>().ok()?;
            let flags = value
                .as_array()?
                .iter()
                .map(|flag| flag.as_bool().unwrap_or(false))
                .collect();
            Some((habit, flags))
        })
        .collect()
}

pub async fn store_checklists(
    cache: &dyn LocalCache,
    scope: &str,
    date: NaiveDate,
    checklists: &DayChecklists,
) -> StoreResult<()> {
    let payload = serde_json::to_string(checklists)?;
    cache.set(scope, &date_key(date), payload).await
}
