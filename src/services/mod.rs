pub mod checklist;
pub mod progress;
pub mod relationships;
pub mod tasks;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use crate::catalog::ProgramCatalog;
use crate::error::AppError;
use crate::models::{
    ApplicationDocument, ApplicationStatus, ChecklistItem, DashboardTask, GlobalTask, Program,
    ProgramId, ProgramRelationship, RecommendationLetter,
};
use crate::store::ApplicationStore;

pub use checklist::ChecklistUpdate;
pub use tasks::SyncReport;

/// The relationship/checklist/task engine for one user session.
///
/// Session state lives behind a single async mutex; every mutating operation
/// computes its next state, writes it through the persistence port, and only
/// then commits it in memory. Readers therefore always see the last confirmed
/// state, never a half-written one.
pub struct Engine {
    user_id: String,
    store: Arc<dyn ApplicationStore>,
    catalog: Arc<dyn ProgramCatalog>,
    state: Mutex<SessionState>,
}

#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) relationships: HashMap<ProgramId, ProgramRelationship>,
    pub(crate) checklists: HashMap<ProgramId, Vec<ChecklistItem>>,
    pub(crate) letters: HashMap<ProgramId, Vec<RecommendationLetter>>,
    pub(crate) documents: HashMap<ProgramId, Vec<ApplicationDocument>>,
    pub(crate) tasks: Vec<GlobalTask>,
    pub(crate) dashboard_tasks: Vec<DashboardTask>,
}

impl SessionState {
    /// Sub-record operations are only legal on target relationships.
    pub(crate) fn require_target(
        &self,
        program_id: &ProgramId,
    ) -> Result<&ProgramRelationship, AppError> {
        let rel = self
            .relationships
            .get(program_id)
            .ok_or(AppError::NotFound)?;
        if !rel.is_target {
            warn!(program = %program_id, "operation attempted on a non-target program");
            return Err(AppError::InvariantViolation(
                "operation requires a target program",
            ));
        }
        Ok(rel)
    }
}

/// Per-program view handed to consumers: relationship fields plus the
/// checklist split into visible and hidden partitions.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramBoardEntry {
    pub program_id: ProgramId,
    pub school_name: String,
    pub program_name: String,
    pub application_deadline: Option<NaiveDate>,
    pub is_target: bool,
    pub status: ApplicationStatus,
    pub notes: String,
    pub progress: u8,
    pub checklist: Vec<ChecklistItem>,
    pub visible_checklist: Vec<ChecklistItem>,
    pub hidden_checklist: Vec<ChecklistItem>,
    pub letters: Vec<RecommendationLetter>,
    pub documents: Vec<ApplicationDocument>,
}

impl Engine {
    /// Builds an engine over the given port and catalog, hydrating session
    /// state from the port.
    pub async fn load(
        user_id: String,
        store: Arc<dyn ApplicationStore>,
        catalog: Arc<dyn ProgramCatalog>,
    ) -> Result<Self, AppError> {
        let mut state = SessionState::default();
        for rel in store.list_relationships(&user_id).await? {
            if rel.is_target {
                let program_id = rel.program_id.clone();
                state.checklists.insert(
                    program_id.clone(),
                    store.list_checklist_items(&user_id, &program_id).await?,
                );
                state.letters.insert(
                    program_id.clone(),
                    store.list_letters(&user_id, &program_id).await?,
                );
                state.documents.insert(
                    program_id.clone(),
                    store.list_documents(&user_id, &program_id).await?,
                );
            }
            state.relationships.insert(rel.program_id.clone(), rel);
        }
        state.tasks = store.list_global_tasks(&user_id).await?;
        state.dashboard_tasks = store.list_dashboard_tasks(&user_id).await?;

        Ok(Self {
            user_id,
            store,
            catalog,
            state: Mutex::new(state),
        })
    }

    pub async fn list_programs(&self) -> Result<Vec<Program>, AppError> {
        self.catalog.list_programs().await
    }

    pub async fn get_program(&self, program_id: &ProgramId) -> Result<Option<Program>, AppError> {
        self.catalog.get_program(program_id).await
    }

    /// All tracked programs, saved and target, sorted by save time.
    pub async fn board(&self) -> Result<Vec<ProgramBoardEntry>, AppError> {
        let state = self.state.lock().await;
        let mut rels: Vec<&ProgramRelationship> = state.relationships.values().collect();
        rels.sort_by_key(|rel| rel.saved_at);

        let mut entries = Vec::with_capacity(rels.len());
        for rel in rels {
            let program = self.catalog.get_program(&rel.program_id).await?;
            entries.push(board_entry(&state, rel, program));
        }
        Ok(entries)
    }

    pub async fn relationship(
        &self,
        program_id: &ProgramId,
    ) -> Result<ProgramBoardEntry, AppError> {
        let state = self.state.lock().await;
        let rel = state
            .relationships
            .get(program_id)
            .ok_or(AppError::NotFound)?;
        let program = self.catalog.get_program(program_id).await?;
        Ok(board_entry(&state, rel, program))
    }

    pub async fn global_tasks(&self) -> Vec<GlobalTask> {
        self.state.lock().await.tasks.clone()
    }

    pub async fn dashboard_tasks(&self) -> Vec<DashboardTask> {
        self.state.lock().await.dashboard_tasks.clone()
    }
}

fn board_entry(
    state: &SessionState,
    rel: &ProgramRelationship,
    program: Option<Program>,
) -> ProgramBoardEntry {
    let checklist = state
        .checklists
        .get(&rel.program_id)
        .cloned()
        .unwrap_or_default();
    let (visible_checklist, hidden_checklist) =
        checklist.iter().cloned().partition(ChecklistItem::visible);

    let (school_name, program_name, application_deadline) = match program {
        Some(p) => (p.school_name, p.program_name, p.application_deadline),
        // Catalog entry gone; keep the relationship readable.
        None => (rel.program_id.to_string(), String::new(), None),
    };

    ProgramBoardEntry {
        program_id: rel.program_id.clone(),
        school_name,
        program_name,
        application_deadline,
        is_target: rel.is_target,
        status: rel.status,
        notes: rel.notes.clone(),
        progress: rel.progress,
        checklist,
        visible_checklist,
        hidden_checklist,
        letters: state
            .letters
            .get(&rel.program_id)
            .cloned()
            .unwrap_or_default(),
        documents: state
            .documents
            .get(&rel.program_id)
            .cloned()
            .unwrap_or_default(),
    }
}
