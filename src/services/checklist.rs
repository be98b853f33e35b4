use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{
    ChecklistItem, HiddenReason, Program, ProgramId, TaskCategory, MAX_CUSTOM_ITEMS,
};
use crate::services::progress::progress;
use crate::services::Engine;

struct DefaultItem {
    id: &'static str,
    label: &'static str,
    category: Option<TaskCategory>,
}

/// Fixed default checklist. Ids are stable across relationships so a single
/// real-world event can address the same item in every target program.
const DEFAULT_ITEMS: [DefaultItem; 8] = [
    DefaultItem { id: "c1", label: "Request official transcripts", category: None },
    DefaultItem { id: "c2", label: "Write personal statement", category: None },
    DefaultItem { id: "c3", label: "Update resume", category: None },
    DefaultItem { id: "c4", label: "Request letters of recommendation", category: None },
    DefaultItem { id: "c5", label: "Take the GRE", category: Some(TaskCategory::Gre) },
    DefaultItem { id: "c6", label: "Send GRE scores", category: Some(TaskCategory::Gre) },
    DefaultItem { id: "c7", label: "Obtain CCRN certification", category: Some(TaskCategory::Ccrn) },
    DefaultItem { id: "c8", label: "Submit application", category: None },
];

/// Generates the default checklist for a program. Exam-related items are
/// pre-hidden when the program's requirement flag for their category is off.
pub fn default_checklist(program: &Program) -> Vec<ChecklistItem> {
    DEFAULT_ITEMS
        .iter()
        .map(|default| {
            let required = default
                .category
                .is_none_or(|category| program.requires(category));
            ChecklistItem {
                id: default.id.to_string(),
                label: default.label.to_string(),
                completed: false,
                is_default: true,
                hidden: !required,
                hidden_reason: (!required).then_some(HiddenReason::SchoolNotRequired),
            }
        })
        .collect()
}

/// Result of a checklist mutation: the touched item plus the relationship's
/// recomputed progress, returned together so consumers never pair an updated
/// item with a stale percentage.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistUpdate {
    pub item: ChecklistItem,
    pub progress: u8,
}

impl Engine {
    /// Sets an item's completion state. Set-semantics rather than a blind
    /// flip, so repeating a double-clicked request is harmless.
    pub async fn set_checklist_item(
        &self,
        program_id: &ProgramId,
        item_id: &str,
        completed: bool,
    ) -> Result<ChecklistUpdate, AppError> {
        let mut state = self.state.lock().await;
        let mut rel = state.require_target(program_id)?.clone();
        let mut items = state
            .checklists
            .get(program_id)
            .cloned()
            .unwrap_or_default();

        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(AppError::NotFound)?;
        if item.completed == completed {
            return Ok(ChecklistUpdate {
                item: item.clone(),
                progress: rel.progress,
            });
        }
        item.completed = completed;
        let item = item.clone();
        rel.progress = progress(&items);

        self.store
            .upsert_relationship_with_items(&self.user_id, &rel, std::slice::from_ref(&item))
            .await?;
        state.relationships.insert(program_id.clone(), rel.clone());
        state.checklists.insert(program_id.clone(), items);
        Ok(ChecklistUpdate {
            item,
            progress: rel.progress,
        })
    }

    /// Appends a custom item, capped at three per relationship.
    pub async fn add_checklist_item(
        &self,
        program_id: &ProgramId,
        label: String,
    ) -> Result<ChecklistUpdate, AppError> {
        let mut state = self.state.lock().await;
        let mut rel = state.require_target(program_id)?.clone();
        let mut items = state
            .checklists
            .get(program_id)
            .cloned()
            .unwrap_or_default();

        let custom_count = items.iter().filter(|i| !i.is_default).count();
        if custom_count >= MAX_CUSTOM_ITEMS {
            warn!(program = %program_id, "custom checklist item limit reached");
            return Err(AppError::CapacityExceeded);
        }

        let item = ChecklistItem::custom(label);
        items.push(item.clone());
        rel.progress = progress(&items);

        self.store
            .upsert_relationship_with_items(&self.user_id, &rel, std::slice::from_ref(&item))
            .await?;
        state.relationships.insert(program_id.clone(), rel.clone());
        state.checklists.insert(program_id.clone(), items);
        info!(program = %program_id, item = %item.id, "added custom checklist item");
        Ok(ChecklistUpdate {
            item,
            progress: rel.progress,
        })
    }

    /// Deletes a custom item. Default items are permanent: attempts to delete
    /// one are rejected without touching any state.
    pub async fn remove_checklist_item(
        &self,
        program_id: &ProgramId,
        item_id: &str,
    ) -> Result<u8, AppError> {
        let mut state = self.state.lock().await;
        let mut rel = state.require_target(program_id)?.clone();
        let mut items = state
            .checklists
            .get(program_id)
            .cloned()
            .unwrap_or_default();

        let position = items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(AppError::NotFound)?;
        if items[position].is_default {
            warn!(program = %program_id, item = item_id, "attempted to delete a default checklist item");
            return Err(AppError::InvariantViolation(
                "default checklist items cannot be deleted",
            ));
        }

        items.remove(position);
        rel.progress = progress(&items);

        self.store
            .delete_checklist_item(&self.user_id, program_id, item_id)
            .await?;
        self.store.upsert_relationship(&self.user_id, &rel).await?;
        state.relationships.insert(program_id.clone(), rel.clone());
        state.checklists.insert(program_id.clone(), items);
        Ok(rel.progress)
    }

    /// Hides an item without touching its completion state. Hidden items drop
    /// out of both sides of the progress ratio.
    pub async fn hide_checklist_item(
        &self,
        program_id: &ProgramId,
        item_id: &str,
        reason: HiddenReason,
    ) -> Result<ChecklistUpdate, AppError> {
        self.set_item_visibility(program_id, item_id, true, Some(reason))
            .await
    }

    pub async fn reveal_checklist_item(
        &self,
        program_id: &ProgramId,
        item_id: &str,
    ) -> Result<ChecklistUpdate, AppError> {
        self.set_item_visibility(program_id, item_id, false, None)
            .await
    }

    async fn set_item_visibility(
        &self,
        program_id: &ProgramId,
        item_id: &str,
        hidden: bool,
        reason: Option<HiddenReason>,
    ) -> Result<ChecklistUpdate, AppError> {
        let mut state = self.state.lock().await;
        let mut rel = state.require_target(program_id)?.clone();
        let mut items = state
            .checklists
            .get(program_id)
            .cloned()
            .unwrap_or_default();

        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(AppError::NotFound)?;
        if item.hidden == hidden {
            return Ok(ChecklistUpdate {
                item: item.clone(),
                progress: rel.progress,
            });
        }
        item.hidden = hidden;
        item.hidden_reason = reason;
        let item = item.clone();
        rel.progress = progress(&items);

        self.store
            .upsert_relationship_with_items(&self.user_id, &rel, std::slice::from_ref(&item))
            .await?;
        state.relationships.insert(program_id.clone(), rel.clone());
        state.checklists.insert(program_id.clone(), items);
        Ok(ChecklistUpdate {
            item,
            progress: rel.progress,
        })
    }
}
