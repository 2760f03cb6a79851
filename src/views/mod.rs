pub mod dashboard;
pub mod editor;
pub mod path;
pub mod today;

use crate::habits::{HabitDefinition, HabitId, HabitMetadata, METADATA_FIELD, default_metadata};
use crate::storage::{DocumentStore, user_doc};
use serde_json::{Value, json};
use tracing::{error, warn};

/// Whether a missing user container is created on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingContainer {
    Initialize,
    ReadOnly,
}

/// Loads the user's habit definitions. Store failures degrade to the empty
/// defaults and are only logged.
pub async fn load_metadata(
    store: &dyn DocumentStore,
    uid: &str,
    missing: MissingContainer,
) -> HabitMetadata {
    let path = user_doc(uid);
    match store.get(&path).await {
        Ok(Some(doc)) => metadata_from_document(&doc),
        Ok(None) => {
            let metadata = default_metadata();
            if missing == MissingContainer::Initialize {
                let doc = json!({ METADATA_FIELD: metadata });
                if let Err(err) = store.set(&path, doc).await {
                    error!(%path, "failed to initialize habit definitions: {err}");
                }
            }
            metadata
        }
        Err(err) => {
            error!(%path, "failed to load habit definitions: {err}");
            default_metadata()
        }
    }
}

/// Every habit gets an entry; malformed or missing definitions read as empty.
pub fn metadata_from_document(doc: &Value) -> HabitMetadata {
    let stored = doc.get(METADATA_FIELD);
    HabitId::ALL
        .into_iter()
        .map(|habit| {
            let definition = match stored.and_then(|all| all.get(habit.as_str())) {
                Some(value) => serde_json::from_value::<HabitDefinition>(value.clone())
                    .unwrap_or_else(|err| {
                        warn!(%habit, "ignoring malformed habit definition: {err}");
                        HabitDefinition::default()
                    }),
                None => HabitDefinition::default(),
            };
            (habit, definition)
        })
        .collect()
}
