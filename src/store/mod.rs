pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    ApplicationDocument, ChecklistItem, DashboardTask, GlobalTask, ProgramId, ProgramRelationship,
    RecommendationLetter,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Store-layer failures. Backend-specific error types stay behind this enum
/// so the engine never sees transport or driver details.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Persistence port for one user's tracked applications.
///
/// All records are keyed by user id plus, where applicable, program id. The
/// engine treats its in-memory session state as a write-through cache of this
/// port: every mutation is persisted here before it is committed in memory.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn list_relationships(
        &self,
        user_id: &str,
    ) -> Result<Vec<ProgramRelationship>, StoreError>;

    async fn upsert_relationship(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
    ) -> Result<(), StoreError>;

    async fn delete_relationship(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<(), StoreError>;

    async fn list_checklist_items(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<ChecklistItem>, StoreError>;

    async fn upsert_checklist_items(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError>;

    async fn delete_checklist_item(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        item_id: &str,
    ) -> Result<(), StoreError>;

    /// Persist a relationship (progress included) and a set of its checklist
    /// items as one logical unit, so no reader of the store can observe an
    /// item flipped without the matching progress value.
    async fn upsert_relationship_with_items(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError>;

    /// Atomically replace the full checklist of a relationship and persist
    /// the relationship itself. Used at target conversion.
    async fn replace_checklist(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError>;

    /// Delete every target-only sub-record (checklist, letters, documents)
    /// of a relationship in one unit.
    async fn delete_target_records(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<(), StoreError>;

    async fn list_letters(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<RecommendationLetter>, StoreError>;

    async fn upsert_letter(
        &self,
        user_id: &str,
        letter: &RecommendationLetter,
    ) -> Result<(), StoreError>;

    async fn delete_letter(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        letter_id: &str,
    ) -> Result<(), StoreError>;

    async fn list_documents(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<ApplicationDocument>, StoreError>;

    async fn upsert_document(
        &self,
        user_id: &str,
        document: &ApplicationDocument,
    ) -> Result<(), StoreError>;

    async fn delete_document(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        document_id: &str,
    ) -> Result<(), StoreError>;

    async fn list_global_tasks(&self, user_id: &str) -> Result<Vec<GlobalTask>, StoreError>;

    async fn upsert_global_task(&self, user_id: &str, task: &GlobalTask)
        -> Result<(), StoreError>;

    async fn delete_global_task(&self, user_id: &str, task_id: &str) -> Result<(), StoreError>;

    async fn list_dashboard_tasks(&self, user_id: &str) -> Result<Vec<DashboardTask>, StoreError>;

    async fn upsert_dashboard_task(
        &self,
        user_id: &str,
        task: &DashboardTask,
    ) -> Result<(), StoreError>;

    async fn delete_dashboard_task(&self, user_id: &str, task_id: &str)
        -> Result<(), StoreError>;
}
