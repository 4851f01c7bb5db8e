//! Completed focus sessions.
//!
//! Records are appended by the timer engine when a work phase completes and
//! are never edited afterwards. The only removal is oldest-first eviction
//! once the log exceeds its retention cap.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TaskLabel;

/// Default cap on stored records.
pub const DEFAULT_RETENTION: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// UTC calendar day the phase ended on.
    pub date: NaiveDate,
    pub label: TaskLabel,
    pub task_title: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub completed: bool,
    /// Minutes credited for this phase.
    #[serde(default)]
    pub minutes: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub a: usize,
    pub b: usize,
}

impl LabelCounts {
    fn add(&mut self, label: TaskLabel) {
        match label {
            TaskLabel::A => self.a += 1,
            TaskLabel::B => self.b += 1,
        }
    }
}

/// Aggregates shown by the stats surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub today: usize,
    pub yesterday: usize,
    /// Monday of the current week through today.
    pub week: usize,
    pub today_by_label: LabelCounts,
    pub week_by_label: LabelCounts,
    pub focus_minutes_today: u64,
    pub focus_minutes_week: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLog {
    records: Vec<SessionRecord>,
    retention: usize,
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl SessionLog {
    pub fn new(retention: usize) -> Self {
        Self {
            records: Vec::new(),
            retention: retention.max(1),
        }
    }

    /// Wrap stored records, evicting the oldest beyond `retention`.
    pub fn from_records(records: Vec<SessionRecord>, retention: usize) -> Self {
        let mut log = Self {
            records,
            retention: retention.max(1),
        };
        log.evict();
        log
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn append(&mut self, record: SessionRecord) {
        tracing::debug!(
            date = %record.date,
            label = %record.label,
            task = %record.task_title,
            "session recorded"
        );
        self.records.push(record);
        self.evict();
    }

    fn evict(&mut self) {
        if self.records.len() > self.retention {
            let excess = self.records.len() - self.retention;
            self.records.drain(..excess);
            tracing::debug!(evicted = excess, "session log trimmed");
        }
    }

    fn completed_on(&self, date: NaiveDate) -> impl Iterator<Item = &SessionRecord> {
        self.records
            .iter()
            .filter(move |r| r.completed && r.date == date)
    }

    fn completed_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Iterator<Item = &SessionRecord> {
        self.records
            .iter()
            .filter(move |r| r.completed && r.date >= from && r.date <= to)
    }

    /// Completed sessions on `date`.
    pub fn count_on(&self, date: NaiveDate) -> usize {
        self.completed_on(date).count()
    }

    pub fn count_on_by_label(&self, date: NaiveDate) -> LabelCounts {
        let mut counts = LabelCounts::default();
        for r in self.completed_on(date) {
            counts.add(r.label);
        }
        counts
    }

    /// Completed sessions with `from <= date <= to`.
    pub fn count_between(&self, from: NaiveDate, to: NaiveDate) -> usize {
        self.completed_between(from, to).count()
    }

    pub fn focus_minutes_on(&self, date: NaiveDate) -> u64 {
        self.completed_on(date).map(|r| u64::from(r.minutes)).sum()
    }

    /// Newest first.
    pub fn recent(&self, n: usize) -> Vec<&SessionRecord> {
        self.records.iter().rev().take(n).collect()
    }

    pub fn summary(&self, today: NaiveDate) -> SessionSummary {
        let yesterday = today - Duration::days(1);
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));

        let mut today_by_label = LabelCounts::default();
        let mut focus_minutes_today = 0;
        for r in self.completed_on(today) {
            today_by_label.add(r.label);
            focus_minutes_today += u64::from(r.minutes);
        }

        let mut week = 0;
        let mut week_by_label = LabelCounts::default();
        let mut focus_minutes_week = 0;
        for r in self.completed_between(week_start, today) {
            week += 1;
            week_by_label.add(r.label);
            focus_minutes_week += u64::from(r.minutes);
        }

        SessionSummary {
            today: today_by_label.a + today_by_label.b,
            yesterday: self.count_on(yesterday),
            week,
            today_by_label,
            week_by_label,
            focus_minutes_today,
            focus_minutes_week,
        }
    }
}
