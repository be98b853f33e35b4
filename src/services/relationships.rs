use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{
    ApplicationDocument, ApplicationStatus, LetterStatus, NewDocumentRequest, NewLetterRequest,
    ProgramId, ProgramRelationship, RecommendationLetter, UpdateRelationshipRequest,
};
use crate::services::checklist::default_checklist;
use crate::services::progress::progress;
use crate::services::Engine;

impl Engine {
    /// Starts tracking a program as saved. Saving an already tracked program
    /// is a no-op returning the existing relationship.
    pub async fn save_program(&self, program_id: &ProgramId) -> Result<ProgramRelationship, AppError> {
        let program = self
            .catalog
            .get_program(program_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut state = self.state.lock().await;
        if let Some(existing) = state.relationships.get(program_id) {
            return Ok(existing.clone());
        }

        let rel = ProgramRelationship::saved(program_id.clone());
        self.store.upsert_relationship(&self.user_id, &rel).await?;
        state.relationships.insert(program_id.clone(), rel.clone());
        info!(program = %program_id, school = %program.school_name, "saved program");
        Ok(rel)
    }

    /// Upgrades a program to a target, creating the relationship if it was
    /// never saved. Always regenerates the default checklist from the
    /// program's current requirement flags, discarding any prior checklist
    /// state; the new checklist is persisted together with the relationship,
    /// so no reader can observe a target without items.
    ///
    /// An id that does not resolve in the catalog is dropped with a warning
    /// rather than surfaced as an error.
    pub async fn convert_to_target(
        &self,
        program_id: &ProgramId,
    ) -> Result<Option<ProgramRelationship>, AppError> {
        let Some(program) = self.catalog.get_program(program_id).await? else {
            warn!(program = %program_id, "target conversion for unknown program");
            return Ok(None);
        };

        let mut state = self.state.lock().await;
        let mut rel = state
            .relationships
            .get(program_id)
            .cloned()
            .unwrap_or_else(|| ProgramRelationship::saved(program_id.clone()));
        rel.is_target = true;

        let items = default_checklist(&program);
        rel.progress = progress(&items);

        self.store
            .replace_checklist(&self.user_id, &rel, &items)
            .await?;
        state.relationships.insert(program_id.clone(), rel.clone());
        state.checklists.insert(program_id.clone(), items);
        info!(program = %program_id, school = %program.school_name, "converted to target");
        Ok(Some(rel))
    }

    /// Downgrades a target back to saved. Destroys the checklist, letters and
    /// documents and resets status, notes and progress. Non-recoverable.
    pub async fn revert_to_saved(
        &self,
        program_id: &ProgramId,
    ) -> Result<ProgramRelationship, AppError> {
        let mut state = self.state.lock().await;
        let mut rel = state
            .relationships
            .get(program_id)
            .cloned()
            .ok_or(AppError::NotFound)?;

        rel.is_target = false;
        rel.progress = 0;
        rel.notes.clear();
        rel.status = ApplicationStatus::default();

        self.store
            .delete_target_records(&self.user_id, program_id)
            .await?;
        self.store.upsert_relationship(&self.user_id, &rel).await?;

        state.checklists.remove(program_id);
        state.letters.remove(program_id);
        state.documents.remove(program_id);
        state.relationships.insert(program_id.clone(), rel.clone());
        info!(program = %program_id, "reverted target to saved");
        Ok(rel)
    }

    /// Deletes the relationship entirely, along with any target sub-records.
    pub async fn remove_program(&self, program_id: &ProgramId) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let rel = state
            .relationships
            .get(program_id)
            .ok_or(AppError::NotFound)?;

        if rel.is_target {
            self.store
                .delete_target_records(&self.user_id, program_id)
                .await?;
        }
        self.store
            .delete_relationship(&self.user_id, program_id)
            .await?;

        state.relationships.remove(program_id);
        state.checklists.remove(program_id);
        state.letters.remove(program_id);
        state.documents.remove(program_id);
        info!(program = %program_id, "removed program");
        Ok(())
    }

    pub async fn update_relationship(
        &self,
        program_id: &ProgramId,
        req: UpdateRelationshipRequest,
    ) -> Result<ProgramRelationship, AppError> {
        let mut state = self.state.lock().await;
        let mut rel = state
            .relationships
            .get(program_id)
            .cloned()
            .ok_or(AppError::NotFound)?;

        if let Some(status) = req.status {
            rel.status = status;
        }
        if let Some(notes) = req.notes {
            rel.notes = notes;
        }

        self.store.upsert_relationship(&self.user_id, &rel).await?;
        state.relationships.insert(program_id.clone(), rel.clone());
        Ok(rel)
    }

    pub async fn add_letter(
        &self,
        program_id: &ProgramId,
        req: NewLetterRequest,
    ) -> Result<RecommendationLetter, AppError> {
        let mut state = self.state.lock().await;
        state.require_target(program_id)?;

        let letter = RecommendationLetter::requested(program_id.clone(), req);
        self.store.upsert_letter(&self.user_id, &letter).await?;
        state
            .letters
            .entry(program_id.clone())
            .or_default()
            .push(letter.clone());
        Ok(letter)
    }

    pub async fn mark_letter_received(
        &self,
        program_id: &ProgramId,
        letter_id: &str,
    ) -> Result<RecommendationLetter, AppError> {
        let mut state = self.state.lock().await;
        state.require_target(program_id)?;

        let letters = state.letters.get(program_id).ok_or(AppError::NotFound)?;
        let mut letter = letters
            .iter()
            .find(|l| l.id == letter_id)
            .cloned()
            .ok_or(AppError::NotFound)?;
        if letter.status == LetterStatus::Received {
            return Ok(letter);
        }
        letter.status = LetterStatus::Received;

        self.store.upsert_letter(&self.user_id, &letter).await?;
        if let Some(letters) = state.letters.get_mut(program_id) {
            if let Some(existing) = letters.iter_mut().find(|l| l.id == letter_id) {
                *existing = letter.clone();
            }
        }
        Ok(letter)
    }

    pub async fn remove_letter(
        &self,
        program_id: &ProgramId,
        letter_id: &str,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        state.require_target(program_id)?;

        let exists = state
            .letters
            .get(program_id)
            .is_some_and(|letters| letters.iter().any(|l| l.id == letter_id));
        if !exists {
            return Err(AppError::NotFound);
        }

        self.store
            .delete_letter(&self.user_id, program_id, letter_id)
            .await?;
        if let Some(letters) = state.letters.get_mut(program_id) {
            letters.retain(|l| l.id != letter_id);
        }
        Ok(())
    }

    pub async fn add_document(
        &self,
        program_id: &ProgramId,
        req: NewDocumentRequest,
    ) -> Result<ApplicationDocument, AppError> {
        let mut state = self.state.lock().await;
        state.require_target(program_id)?;

        let document = ApplicationDocument::new(program_id.clone(), req);
        self.store.upsert_document(&self.user_id, &document).await?;
        state
            .documents
            .entry(program_id.clone())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    pub async fn remove_document(
        &self,
        program_id: &ProgramId,
        document_id: &str,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        state.require_target(program_id)?;

        let exists = state
            .documents
            .get(program_id)
            .is_some_and(|documents| documents.iter().any(|d| d.id == document_id));
        if !exists {
            return Err(AppError::NotFound);
        }

        self.store
            .delete_document(&self.user_id, program_id, document_id)
            .await?;
        if let Some(documents) = state.documents.get_mut(program_id) {
            documents.retain(|d| d.id != document_id);
        }
        Ok(())
    }
}
