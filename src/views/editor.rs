use crate::habits::{HabitId, METADATA_FIELD, default_metadata};
use crate::session::Session;
use crate::storage::{DocumentStore, user_doc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("Invalid JSON. Fix it and try again.")]
    InvalidJson,

    #[error("Invalid habit definitions: {0}")]
    InvalidShape(String),
}

/// Shape accepted on save. Lists left out keep their stored value.
// Validation schema only; the merge writes the parsed value itself.
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefinitionPatch {
    tasks: Option<Vec<String>>,
    principles: Option<Vec<String>>,
    challenges: Option<Vec<String>>,
}

/// The stored container, pretty-printed. A user without one gets the five
/// empty definitions, which are persisted as well.
pub async fn load_text(store: &dyn DocumentStore, session: &Session) -> String {
    let path = user_doc(&session.uid);
    let container = match store.get(&path).await {
        Ok(Some(doc)) => doc
            .get(METADATA_FIELD)
            .cloned()
            .unwrap_or_else(|| json!(default_metadata())),
        Ok(None) => {
            let container = json!(default_metadata());
            if let Err(err) = store.set(&path, json!({ METADATA_FIELD: container })).await {
                error!(%path, "failed to initialize habit definitions: {err}");
            }
            container
        }
        Err(err) => {
            error!(%path, "failed to load habit definitions: {err}");
            json!(default_metadata())
        }
    };
    serde_json::to_string_pretty(&container).unwrap_or_else(|_| container.to_string())
}

/// Parses `text` and merge-writes it into the container. Nothing is written
/// unless the whole text parses.
pub async fn save(store: &dyn DocumentStore, session: &Session, text: &str) -> Result<(), EditorError> {
    let parsed = parse(text)?;
    let path = user_doc(&session.uid);
    match store.merge(&path, json!({ METADATA_FIELD: parsed })).await {
        Ok(()) => info!(uid = %session.uid, "habit definitions saved"),
        Err(err) => error!(%path, "failed to save habit definitions: {err}"),
    }
    Ok(())
}

fn parse(text: &str) -> Result<Value, EditorError> {
    let value: Value = serde_json::from_str(text).map_err(|_| EditorError::InvalidJson)?;
    serde_json::from_value::<BTreeMap<HabitId, DefinitionPatch>>(value.clone())
        .map_err(|err| EditorError::InvalidShape(err.to_string()))?;
    Ok(value)
}
