//! Overdue evaluation for tasks.

use crate::models::properties::{common, task};
use crate::models::{CrmObject, FilterGroup, LinkedRecords, SearchFilter};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status values accepted by HubSpot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Waiting,
    Completed,
    Deferred,
}

impl TaskStatus {
    pub fn as_api_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Waiting => "WAITING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Deferred => "DEFERRED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverdueAnnotation {
    pub is_overdue: bool,
    pub overdue_days: i64,
}

/// A task with its derived overdue fields and, optionally, its linked records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedTask {
    #[serde(flatten)]
    pub task: CrmObject,

    #[serde(flatten)]
    pub overdue: OverdueAnnotation,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked: Option<LinkedRecords>,
}

pub struct OverdueCalculator;

impl OverdueCalculator {
    /// Overdue when the due timestamp (`hs_timestamp`) is before `now` and the
    /// status is anything but `COMPLETED`. Tasks with no parsable due date are
    /// never overdue.
    pub fn evaluate(task: &CrmObject, now: DateTime<Utc>) -> OverdueAnnotation {
        let completed = task.property(task::STATUS) == Some(TaskStatus::Completed.as_api_str());
        match task.timestamp_property(common::TIMESTAMP) {
            Some(due) if due < now && !completed => OverdueAnnotation {
                is_overdue: true,
                overdue_days: (now - due).num_days(),
            },
            _ => OverdueAnnotation::default(),
        }
    }

    pub fn annotate(task: CrmObject, now: DateTime<Utc>) -> AnnotatedTask {
        let overdue = Self::evaluate(&task, now);
        AnnotatedTask {
            task,
            overdue,
            linked: None,
        }
    }

    pub fn annotate_all(tasks: Vec<CrmObject>, now: DateTime<Utc>) -> Vec<AnnotatedTask> {
        tasks
            .into_iter()
            .map(|task| Self::annotate(task, now))
            .collect()
    }

    /// Server-side equivalent of [`evaluate`](Self::evaluate) for bulk queries.
    pub fn server_filter(now: DateTime<Utc>) -> FilterGroup {
        FilterGroup::new()
            .and(SearchFilter::neq(task::STATUS, TaskStatus::Completed.as_api_str()))
            .and(SearchFilter::lt(
                common::TIMESTAMP,
                now.timestamp_millis().to_string(),
            ))
    }
}
