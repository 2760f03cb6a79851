use crate::habits::{CompletionRecord, HabitId};
use crate::session::Session;
use crate::storage::{DocumentStore, days_collection};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Every stored completion record for one user, keyed by `YYYY-MM-DD`.
#[derive(Debug, Clone, Default)]
pub struct DayHistory {
    pub days: BTreeMap<String, CompletionRecord>,
}

impl DayHistory {
    /// Full scan of the user's day collection. A failed scan reads as empty.
    pub async fn load(store: &dyn DocumentStore, session: &Session) -> Self {
        let collection = days_collection(&session.uid);
        match store.list(&collection).await {
            Ok(docs) => Self {
                days: docs
                    .into_iter()
                    .map(|(id, doc)| (id, CompletionRecord::from_document(&doc)))
                    .collect(),
            },
            Err(err) => {
                error!(%collection, "failed to load completion history: {err}");
                Self::default()
            }
        }
    }

    /// Every stored day counts toward the denominator; a missing habit key
    /// counts as not done.
    pub fn percentage(&self, habit: HabitId) -> u32 {
        let total = self.days.len();
        if total == 0 {
            return 0;
        }
        let done = self.days.values().filter(|record| record.is_done(habit)).count();
        (100.0 * done as f64 / total as f64).round() as u32
    }

    pub fn stats(&self) -> Vec<HabitStat> {
        HabitId::ALL
            .into_iter()
            .map(|habit| HabitStat {
                habit,
                label: habit.label(),
                percentage: self.percentage(habit),
            })
            .collect()
    }

    pub fn record(&self, date: NaiveDate) -> Option<&CompletionRecord> {
        self.days.get(&crate::habits::date_key(date))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitStat {
    pub habit: HabitId,
    pub label: String,
    pub percentage: u32,
}

/// Calendar cell colour: number of habits done, or no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayShade {
    NoRecord,
    Done(usize),
}

impl DayShade {
    pub fn for_record(record: Option<&CompletionRecord>) -> Self {
        match record {
            Some(record) => DayShade::Done(record.done_count()),
            None => DayShade::NoRecord,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            DayShade::NoRecord => "shade-none",
            DayShade::Done(5..) => "shade-5",
            DayShade::Done(4) => "shade-4",
            DayShade::Done(3) => "shade-3",
            DayShade::Done(2) => "shade-2",
            DayShade::Done(1) => "shade-1",
            DayShade::Done(_) => "shade-0",
        }
    }
}

/// A displayed month. `month` is zero-based (0 = January).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthCursor {
    pub year: i32,
    pub month: u32,
}

impl MonthCursor {
    /// `None` unless the month and both its neighbours are calendar months
    /// chrono can represent.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let cursor = Self { year, month };
        let representable = month < 12
            && cursor.prev().first_day().is_some()
            && cursor.next().first_day().is_some();
        representable.then_some(cursor)
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 0 {
            Self {
                year: self.year.saturating_sub(1),
                month: 11,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 11 {
            Self {
                year: self.year.saturating_add(1),
                month: 0,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn label(self) -> String {
        format!("{} {}", MONTH_NAMES[self.month as usize], self.year)
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
    }

    pub fn days_in_month(self) -> u32 {
        let (Some(first), Some(following)) = (self.first_day(), self.next().first_day()) else {
            return 0;
        };
        (following - first).num_days() as u32
    }

    /// Sunday-first grid: leading blanks for the weekday of the 1st, then one
    /// cell per day.
    pub fn grid(self, history: &DayHistory) -> Vec<Option<DayCell>> {
        let Some(first) = self.first_day() else {
            return Vec::new();
        };
        let leading = first.weekday().num_days_from_sunday() as usize;
        let mut cells: Vec<Option<DayCell>> = vec![None; leading];
        for offset in 0..self.days_in_month() {
            let date = first + chrono::Duration::days(i64::from(offset));
            let record = history.record(date);
            cells.push(Some(DayCell {
                day: date.day(),
                date: crate::habits::date_key(date),
                shade: DayShade::for_record(record).css_class(),
                habits: record.map(|record| {
                    HabitId::ALL
                        .into_iter()
                        .map(|habit| (habit, record.is_done(habit)))
                        .collect()
                }),
            }));
        }
        cells
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCell {
    pub day: u32,
    pub date: String,
    pub shade: &'static str,
    /// Tooltip rows; absent when the day has no record.
    pub habits: Option<Vec<(HabitId, bool)>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub stats: Vec<HabitStat>,
    pub cursor: MonthCursor,
    pub label: String,
    pub prev: MonthCursor,
    pub next: MonthCursor,
    pub cells: Vec<Option<DayCell>>,
}

pub fn snapshot(history: &DayHistory, cursor: MonthCursor) -> DashboardSnapshot {
    DashboardSnapshot {
        stats: history.stats(),
        cursor,
        label: cursor.label(),
        prev: cursor.prev(),
        next: cursor.next(),
        cells: cursor.grid(history),
    }
}
