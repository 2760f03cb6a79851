use crate::habits::HabitId;
use serde::Serialize;
use thiserror::Error;

/// Checkmark state for one habit on one day.
///
/// `top` is the flag persisted remotely; `tasks` exists only in the local
/// cache. While `tasks` is non-empty, every transition leaves
/// `top == tasks.iter().all(..)`. With no tasks, `top` stands alone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HabitChecklist {
    pub top: bool,
    pub tasks: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistAction {
    SetTop(bool),
    SetTask(usize, bool),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecklistError {
    #[error("habit '{habit}' has no task at index {index} (it has {len})")]
    TaskOutOfRange {
        habit: HabitId,
        index: usize,
        len: usize,
    },
}

impl HabitChecklist {
    /// Rebuilds the checklist at view load. Each task takes its cached value
    /// when one exists at that index, otherwise the remote top-level flag.
    pub fn reconcile(task_count: usize, top: bool, cached: Option<&[bool]>) -> Self {
        let tasks = (0..task_count)
            .map(|index| {
                cached
                    .and_then(|values| values.get(index).copied())
                    .unwrap_or(top)
            })
            .collect();
        Self { top, tasks }
    }

    pub fn set_top(&self, value: bool) -> Self {
        Self {
            top: value,
            tasks: vec![value; self.tasks.len()],
        }
    }

    pub fn apply(&self, habit: HabitId, action: ChecklistAction) -> Result<Self, ChecklistError> {
        match action {
            ChecklistAction::SetTop(value) => Ok(self.set_top(value)),
            ChecklistAction::SetTask(index, value) => {
                if index >= self.tasks.len() {
                    return Err(ChecklistError::TaskOutOfRange {
                        habit,
                        index,
                        len: self.tasks.len(),
                    });
                }
                let mut tasks = self.tasks.clone();
                tasks[index] = value;
                Ok(Self {
                    top: tasks.iter().all(|done| *done),
                    tasks,
                })
            }
        }
    }

    pub fn done_tasks(&self) -> usize {
        self.tasks.iter().filter(|done| **done).count()
    }

    pub fn progress_percent(&self) -> f64 {
        if self.tasks.is_empty() {
            return if self.top { 100.0 } else { 0.0 };
        }
        self.done_tasks() as f64 / self.tasks.len() as f64 * 100.0
    }

    pub fn shade(&self) -> ProgressShade {
        ProgressShade::from_percent(self.progress_percent())
    }
}

/// Header colour of a habit card on the daily view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressShade {
    Complete,
    Strong,
    Partial,
    Low,
}

impl ProgressShade {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            ProgressShade::Complete
        } else if percent >= 60.0 {
            ProgressShade::Strong
        } else if percent >= 30.0 {
            ProgressShade::Partial
        } else {
            ProgressShade::Low
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ProgressShade::Complete => "progress-complete",
            ProgressShade::Strong => "progress-strong",
            ProgressShade::Partial => "progress-partial",
            ProgressShade::Low => "progress-low",
        }
    }
}
