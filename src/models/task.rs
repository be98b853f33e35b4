use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::program::ProgramId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Gre,
    Ccrn,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Gre => "gre",
            TaskCategory::Ccrn => "ccrn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gre" => Some(TaskCategory::Gre),
            "ccrn" => Some(TaskCategory::Ccrn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(TaskStatus::NotStarted),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

/// A task tracked once per user, not owned by any single relationship.
///
/// `due_date` and `linked_program_id` are derived from the target set at
/// creation time and are stale thereafter until recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalTask {
    pub id: String,
    pub task: String,
    pub category: TaskCategory,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub linked_program_id: Option<ProgramId>,
    pub triggers_checklist_sync: bool,
    #[serde(default)]
    pub checklist_item_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalTaskTemplate {
    pub task: String,
    pub category: TaskCategory,
    pub weeks_before_deadline: i64,
    #[serde(default)]
    pub triggers_checklist_sync: bool,
    /// Default checklist item ids a completed task of this category propagates to.
    #[serde(default)]
    pub checklist_item_ids: Vec<String>,
}

/// Degenerate task shown before the user has any target programs.
/// No deadline derivation, no cross-entity invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardTask {
    pub id: String,
    pub task: String,
    pub completed: bool,
}

/// The target program supplying the earliest relevant deadline for a category.
#[derive(Debug, Clone, Serialize)]
pub struct DeadlineSource {
    pub program_id: ProgramId,
    pub school_name: String,
    pub deadline: NaiveDate,
}
