use chrono::Duration;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    DashboardTask, DeadlineSource, GlobalTask, GlobalTaskTemplate, ProgramId, TaskCategory,
    TaskStatus,
};
use crate::services::progress::progress;
use crate::services::{Engine, SessionState};

/// Outcome of a cross-program checklist sync. `completed` and `failed` name
/// the relationships whose writes went through or did not; `unchanged` lists
/// targets that already had every addressed item in the requested state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub completed: Vec<ProgramId>,
    pub unchanged: Vec<ProgramId>,
    pub failed: Vec<ProgramId>,
}

impl Engine {
    /// The nearest application deadline among target programs that require
    /// the given exam category, with the program supplying it.
    pub async fn earliest_deadline_for_category(
        &self,
        category: TaskCategory,
    ) -> Result<Option<DeadlineSource>, AppError> {
        let state = self.state.lock().await;
        self.earliest_deadline_locked(&state, category).await
    }

    async fn earliest_deadline_locked(
        &self,
        state: &SessionState,
        category: TaskCategory,
    ) -> Result<Option<DeadlineSource>, AppError> {
        let mut best: Option<DeadlineSource> = None;
        for rel in state.relationships.values().filter(|r| r.is_target) {
            let Some(program) = self.catalog.get_program(&rel.program_id).await? else {
                continue;
            };
            if !program.requires(category) {
                continue;
            }
            let Some(deadline) = program.application_deadline else {
                continue;
            };
            if best.as_ref().is_none_or(|b| deadline < b.deadline) {
                best = Some(DeadlineSource {
                    program_id: rel.program_id.clone(),
                    school_name: program.school_name,
                    deadline,
                });
            }
        }
        Ok(best)
    }

    /// Creates a global task from a template. The due date is derived from
    /// the earliest relevant deadline at creation time and goes stale until
    /// recomputed; with no resolvable deadline the task exists undated.
    ///
    /// Category uniqueness is the caller's responsibility; an open duplicate
    /// only draws a warning.
    pub async fn add_global_task(
        &self,
        template: GlobalTaskTemplate,
    ) -> Result<GlobalTask, AppError> {
        let mut state = self.state.lock().await;

        if state
            .tasks
            .iter()
            .any(|t| t.category == template.category && t.status != TaskStatus::Completed)
        {
            warn!(category = template.category.as_str(), "open task of this category already exists");
        }

        let source = self
            .earliest_deadline_locked(&state, template.category)
            .await?;
        let (due_date, linked_program_id) = match source {
            Some(source) => (
                Some(source.deadline - Duration::weeks(template.weeks_before_deadline)),
                Some(source.program_id),
            ),
            None => (None, None),
        };

        let task = GlobalTask {
            id: Uuid::new_v4().to_string(),
            task: template.task,
            category: template.category,
            status: TaskStatus::NotStarted,
            due_date,
            linked_program_id,
            triggers_checklist_sync: template.triggers_checklist_sync,
            checklist_item_ids: template.checklist_item_ids,
        };

        self.store.upsert_global_task(&self.user_id, &task).await?;
        state.tasks.push(task.clone());
        info!(task = %task.id, category = task.category.as_str(), "created global task");
        Ok(task)
    }

    /// Marks a task completed and returns it. Completion does not propagate
    /// to checklists by itself; the caller decides whether to follow up with
    /// `sync_checklist_items`, since that mutates many relationships at once.
    /// Completing an already-completed task is a no-op.
    pub async fn complete_global_task(&self, task_id: &str) -> Result<GlobalTask, AppError> {
        let mut state = self.state.lock().await;
        let index = state
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or(AppError::NotFound)?;

        let mut task = state.tasks[index].clone();
        if task.status == TaskStatus::Completed {
            return Ok(task);
        }
        task.status = TaskStatus::Completed;

        self.store.upsert_global_task(&self.user_id, &task).await?;
        state.tasks[index] = task.clone();
        info!(task = %task.id, "completed global task");
        Ok(task)
    }

    pub async fn delete_global_task(&self, task_id: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if !state.tasks.iter().any(|t| t.id == task_id) {
            return Err(AppError::NotFound);
        }
        self.store.delete_global_task(&self.user_id, task_id).await?;
        state.tasks.retain(|t| t.id != task_id);
        Ok(())
    }

    /// Fans a completion state out to the named checklist items of every
    /// target relationship, recomputing each relationship's progress.
    ///
    /// Hidden items are mutated like any other; they just stay out of the
    /// progress ratio. Successful writes are committed even when others
    /// fail, and a partial failure reports exactly which program ids did
    /// not go through so the caller can retry just those.
    pub async fn sync_checklist_items(
        &self,
        item_ids: &[String],
        completed: bool,
    ) -> Result<SyncReport, AppError> {
        let mut state = self.state.lock().await;
        let target_ids: Vec<ProgramId> = state
            .relationships
            .values()
            .filter(|r| r.is_target)
            .map(|r| r.program_id.clone())
            .collect();

        let mut report = SyncReport::default();
        for program_id in target_ids {
            let (Some(rel), Some(items)) = (
                state.relationships.get(&program_id),
                state.checklists.get(&program_id),
            ) else {
                continue;
            };
            let mut rel = rel.clone();
            let mut items = items.clone();

            let mut touched = Vec::new();
            for item in items.iter_mut() {
                if item_ids.iter().any(|id| *id == item.id) && item.completed != completed {
                    item.completed = completed;
                    touched.push(item.clone());
                }
            }
            if touched.is_empty() {
                report.unchanged.push(program_id);
                continue;
            }
            rel.progress = progress(&items);

            match self
                .store
                .upsert_relationship_with_items(&self.user_id, &rel, &touched)
                .await
            {
                Ok(()) => {
                    state.relationships.insert(program_id.clone(), rel);
                    state.checklists.insert(program_id.clone(), items);
                    report.completed.push(program_id);
                }
                Err(e) => {
                    warn!(program = %program_id, error = %e, "checklist sync write failed");
                    report.failed.push(program_id);
                }
            }
        }

        info!(
            updated = report.completed.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "checklist sync finished"
        );
        if report.failed.is_empty() {
            Ok(report)
        } else {
            Err(AppError::SyncIncomplete {
                completed: report.completed,
                failed: report.failed,
            })
        }
    }

    pub async fn add_dashboard_task(&self, task: String) -> Result<DashboardTask, AppError> {
        let mut state = self.state.lock().await;
        let task = DashboardTask {
            id: Uuid::new_v4().to_string(),
            task,
            completed: false,
        };
        self.store
            .upsert_dashboard_task(&self.user_id, &task)
            .await?;
        state.dashboard_tasks.push(task.clone());
        Ok(task)
    }

    pub async fn set_dashboard_task(
        &self,
        task_id: &str,
        completed: bool,
    ) -> Result<DashboardTask, AppError> {
        let mut state = self.state.lock().await;
        let index = state
            .dashboard_tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or(AppError::NotFound)?;

        let mut task = state.dashboard_tasks[index].clone();
        if task.completed == completed {
            return Ok(task);
        }
        task.completed = completed;

        self.store
            .upsert_dashboard_task(&self.user_id, &task)
            .await?;
        state.dashboard_tasks[index] = task.clone();
        Ok(task)
    }

    pub async fn delete_dashboard_task(&self, task_id: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if !state.dashboard_tasks.iter().any(|t| t.id == task_id) {
            return Err(AppError::NotFound);
        }
        self.store
            .delete_dashboard_task(&self.user_id, task_id)
            .await?;
        state.dashboard_tasks.retain(|t| t.id != task_id);
        Ok(())
    }
}
