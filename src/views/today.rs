//! Daily tracking: merges the remote completion record, the remote task
//! definitions and the locally cached task checkmarks for one day.

use super::{MissingContainer, load_metadata};
use crate::cache::{DayChecklists, LocalCache, load_checklists, store_checklists};
use crate::checklist::{ChecklistAction, ChecklistError, HabitChecklist, ProgressShade};
use crate::habits::{CompletionRecord, HabitId, date_key};
use crate::remote::{PendingWrite, spawn_merge};
use crate::session::Session;
use crate::storage::{DocumentStore, day_doc};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{error, info};

#[derive(Debug, Clone, Serialize)]
pub struct HabitCard {
    pub habit: HabitId,
    pub label: String,
    pub tasks: Vec<String>,
    pub checklist: HabitChecklist,
    pub shade: ProgressShade,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodaySnapshot {
    pub date: String,
    pub habits: Vec<HabitCard>,
}

pub struct TodayView {
    session: Session,
    date: NaiveDate,
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn LocalCache>,
    tasks: BTreeMap<HabitId, Vec<String>>,
    checklists: BTreeMap<HabitId, HabitChecklist>,
}

impl TodayView {
    pub async fn load(
        session: Session,
        date: NaiveDate,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn LocalCache>,
    ) -> Self {
        let record = match store.get(&day_doc(&session.uid, date)).await {
            Ok(Some(doc)) => CompletionRecord::from_document(&doc),
            Ok(None) => CompletionRecord::default(),
            Err(err) => {
                error!(uid = %session.uid, date = %date_key(date), "failed to load completion record: {err}");
                CompletionRecord::default()
            }
        };

        let metadata = load_metadata(store.as_ref(), &session.uid, MissingContainer::Initialize).await;
        let cached = load_checklists(cache.as_ref(), &session.uid, date).await;

        let mut tasks = BTreeMap::new();
        let mut checklists = BTreeMap::new();
        for habit in HabitId::ALL {
            let habit_tasks = metadata
                .get(&habit)
                .map(|definition| definition.tasks.clone())
                .unwrap_or_default();
            let checklist = HabitChecklist::reconcile(
                habit_tasks.len(),
                record.is_done(habit),
                cached.get(&habit).map(Vec::as_slice),
            );
            tasks.insert(habit, habit_tasks);
            checklists.insert(habit, checklist);
        }

        Self {
            session,
            date,
            store,
            cache,
            tasks,
            checklists,
        }
    }

    pub fn checklist(&self, habit: HabitId) -> &HabitChecklist {
        &self.checklists[&habit]
    }

    pub fn snapshot(&self) -> TodaySnapshot {
        TodaySnapshot {
            date: date_key(self.date),
            habits: HabitId::ALL.into_iter().map(|habit| self.card(habit)).collect(),
        }
    }

    pub fn card(&self, habit: HabitId) -> HabitCard {
        let checklist = self.checklists[&habit].clone();
        HabitCard {
            habit,
            label: habit.label(),
            tasks: self.tasks[&habit].clone(),
            shade: checklist.shade(),
            checklist,
        }
    }

    pub async fn set_habit_top_level(&mut self, habit: HabitId, value: bool) -> PendingWrite {
        let next = self.checklists[&habit].set_top(value);
        self.commit(habit, next, ChecklistAction::SetTop(value)).await
    }

    pub async fn set_task(
        &mut self,
        habit: HabitId,
        index: usize,
        value: bool,
    ) -> Result<PendingWrite, ChecklistError> {
        let action = ChecklistAction::SetTask(index, value);
        let next = self.checklists[&habit].apply(habit, action)?;
        Ok(self.commit(habit, next, action).await)
    }

    async fn commit(
        &mut self,
        habit: HabitId,
        next: HabitChecklist,
        action: ChecklistAction,
    ) -> PendingWrite {
        let top = next.top;
        self.checklists.insert(habit, next);
        info!(uid = %self.session.uid, %habit, top, ?action, "habit checklist updated");

        let cached: DayChecklists = self
            .checklists
            .iter()
            .filter(|(_, checklist)| !checklist.tasks.is_empty())
            .map(|(habit, checklist)| (*habit, checklist.tasks.clone()))
            .collect();
        if let Err(err) = store_checklists(self.cache.as_ref(), &self.session.uid, self.date, &cached).await {
            error!(uid = %self.session.uid, "failed to cache task checklist: {err}");
        }

        spawn_merge(
            Arc::clone(&self.store),
            day_doc(&self.session.uid, self.date),
            json!({ habit.as_str(): top }),
        )
    }
}
