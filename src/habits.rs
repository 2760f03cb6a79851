use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

/// One of the five tracked habits. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitId {
    Middle,
    Index,
    Thumb,
    Ring,
    Pinky,
}

impl HabitId {
    pub const ALL: [HabitId; 5] = [
        HabitId::Middle,
        HabitId::Index,
        HabitId::Thumb,
        HabitId::Ring,
        HabitId::Pinky,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HabitId::Middle => "middle",
            HabitId::Index => "index",
            HabitId::Thumb => "thumb",
            HabitId::Ring => "ring",
            HabitId::Pinky => "pinky",
        }
    }

    /// Capitalized form used in page headings.
    pub fn label(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown habit '{0}'")]
pub struct UnknownHabit(pub String);

impl FromStr for HabitId {
    type Err = UnknownHabit;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        HabitId::ALL
            .into_iter()
            .find(|habit| habit.as_str() == value)
            .ok_or_else(|| UnknownHabit(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HabitDefinition {
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
}

/// The per-user container stored under `habitMetadata`.
pub type HabitMetadata = BTreeMap<HabitId, HabitDefinition>;

pub const METADATA_FIELD: &str = "habitMetadata";

/// Five empty definitions, written when a user has no container yet.
pub fn default_metadata() -> HabitMetadata {
    HabitId::ALL
        .into_iter()
        .map(|habit| (habit, HabitDefinition::default()))
        .collect()
}

/// Top-level completion for one calendar day. Missing keys read as false.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionRecord(pub BTreeMap<HabitId, bool>);

impl CompletionRecord {
    pub fn is_done(&self, habit: HabitId) -> bool {
        self.0.get(&habit).copied().unwrap_or(false)
    }

    pub fn done_count(&self) -> usize {
        HabitId::ALL
            .into_iter()
            .filter(|habit| self.is_done(*habit))
            .count()
    }

    /// Reads a stored day document leniently: non-boolean values and unknown
    /// keys are ignored.
    pub fn from_document(value: &serde_json::Value) -> Self {
        let mut record = BTreeMap::new();
        if let Some(fields) = value.as_object() {
            for (key, field) in fields {
                if let (Ok(habit), Some(done)) = (key.parse::<HabitId>(), field.as_bool()) {
                    record.insert(habit, done);
                }
            }
        }
        CompletionRecord(record)
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
