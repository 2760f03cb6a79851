use super::{MissingContainer, load_metadata};
use crate::habits::{HabitDefinition, HabitId};
use crate::session::Session;
use crate::storage::DocumentStore;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HabitLink {
    pub habit: HabitId,
    pub label: String,
    pub href: String,
}

pub async fn list(store: &dyn DocumentStore, session: &Session) -> Vec<HabitLink> {
    load_metadata(store, &session.uid, MissingContainer::Initialize)
        .await
        .into_keys()
        .map(|habit| HabitLink {
            habit,
            label: habit.label(),
            href: format!("/yourpath/{habit}"),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailSection {
    pub label: &'static str,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitDetail {
    pub habit: HabitId,
    pub label: String,
    pub sections: Vec<DetailSection>,
}

impl HabitDetail {
    pub fn new(habit: HabitId, definition: HabitDefinition) -> Self {
        Self {
            habit,
            label: habit.label(),
            sections: vec![
                DetailSection {
                    label: "Daily Tasks",
                    items: definition.tasks,
                },
                DetailSection {
                    label: "Principles",
                    items: definition.principles,
                },
                DetailSection {
                    label: "Challenges",
                    items: definition.challenges,
                },
            ],
        }
    }
}

/// Read-only; a missing container or habit shows empty lists.
pub async fn detail(store: &dyn DocumentStore, session: &Session, habit: HabitId) -> HabitDetail {
    let mut metadata = load_metadata(store, &session.uid, MissingContainer::ReadOnly).await;
    HabitDetail::new(habit, metadata.remove(&habit).unwrap_or_default())
}
