use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{
    ApplicationDocument, ChecklistItem, DashboardTask, GlobalTask, ProgramId, ProgramRelationship,
    RecommendationLetter,
};
use crate::store::{ApplicationStore, StoreError};

type Key = (String, ProgramId);

/// Anonymous/local fallback backend: plain maps behind one lock. Also the
/// store double used by the engine tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    relationships: HashMap<Key, ProgramRelationship>,
    checklists: HashMap<Key, Vec<ChecklistItem>>,
    letters: HashMap<Key, Vec<RecommendationLetter>>,
    documents: HashMap<Key, Vec<ApplicationDocument>>,
    global_tasks: HashMap<String, Vec<GlobalTask>>,
    dashboard_tasks: HashMap<String, Vec<DashboardTask>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(user_id: &str, program_id: &ProgramId) -> Key {
    (user_id.to_string(), program_id.clone())
}

fn upsert_by_id<T, F>(records: &mut Vec<T>, record: T, same: F)
where
    F: Fn(&T) -> bool,
{
    match records.iter_mut().find(|r| same(r)) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn list_relationships(
        &self,
        user_id: &str,
    ) -> Result<Vec<ProgramRelationship>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .relationships
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|(_, rel)| rel.clone())
            .collect())
    }

    async fn upsert_relationship(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .relationships
            .insert(key(user_id, &rel.program_id), rel.clone());
        Ok(())
    }

    async fn delete_relationship(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.relationships.remove(&key(user_id, program_id));
        Ok(())
    }

    async fn list_checklist_items(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<ChecklistItem>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .checklists
            .get(&key(user_id, program_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_checklist_items(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let checklist = inner.checklists.entry(key(user_id, program_id)).or_default();
        for item in items {
            upsert_by_id(checklist, item.clone(), |existing| existing.id == item.id);
        }
        Ok(())
    }

    async fn delete_checklist_item(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        item_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(checklist) = inner.checklists.get_mut(&key(user_id, program_id)) {
            checklist.retain(|item| item.id != item_id);
        }
        Ok(())
    }

    async fn upsert_relationship_with_items(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let k = key(user_id, &rel.program_id);
        let checklist = inner.checklists.entry(k.clone()).or_default();
        for item in items {
            upsert_by_id(checklist, item.clone(), |existing| existing.id == item.id);
        }
        inner.relationships.insert(k, rel.clone());
        Ok(())
    }

    async fn replace_checklist(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let k = key(user_id, &rel.program_id);
        inner.checklists.insert(k.clone(), items.to_vec());
        inner.relationships.insert(k, rel.clone());
        Ok(())
    }

    async fn delete_target_records(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let k = key(user_id, program_id);
        inner.checklists.remove(&k);
        inner.letters.remove(&k);
        inner.documents.remove(&k);
        Ok(())
    }

    async fn list_letters(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<RecommendationLetter>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .letters
            .get(&key(user_id, program_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_letter(
        &self,
        user_id: &str,
        letter: &RecommendationLetter,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let letters = inner
            .letters
            .entry(key(user_id, &letter.program_id))
            .or_default();
        upsert_by_id(letters, letter.clone(), |existing| existing.id == letter.id);
        Ok(())
    }

    async fn delete_letter(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        letter_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(letters) = inner.letters.get_mut(&key(user_id, program_id)) {
            letters.retain(|letter| letter.id != letter_id);
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<ApplicationDocument>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .documents
            .get(&key(user_id, program_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_document(
        &self,
        user_id: &str,
        document: &ApplicationDocument,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let documents = inner
            .documents
            .entry(key(user_id, &document.program_id))
            .or_default();
        upsert_by_id(documents, document.clone(), |existing| {
            existing.id == document.id
        });
        Ok(())
    }

    async fn delete_document(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        document_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(documents) = inner.documents.get_mut(&key(user_id, program_id)) {
            documents.retain(|document| document.id != document_id);
        }
        Ok(())
    }

    async fn list_global_tasks(&self, user_id: &str) -> Result<Vec<GlobalTask>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.global_tasks.get(user_id).cloned().unwrap_or_default())
    }

    async fn upsert_global_task(
        &self,
        user_id: &str,
        task: &GlobalTask,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let tasks = inner.global_tasks.entry(user_id.to_string()).or_default();
        upsert_by_id(tasks, task.clone(), |existing| existing.id == task.id);
        Ok(())
    }

    async fn delete_global_task(&self, user_id: &str, task_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(tasks) = inner.global_tasks.get_mut(user_id) {
            tasks.retain(|task| task.id != task_id);
        }
        Ok(())
    }

    async fn list_dashboard_tasks(&self, user_id: &str) -> Result<Vec<DashboardTask>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .dashboard_tasks
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_dashboard_task(
        &self,
        user_id: &str,
        task: &DashboardTask,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let tasks = inner.dashboard_tasks.entry(user_id.to_string()).or_default();
        upsert_by_id(tasks, task.clone(), |existing| existing.id == task.id);
        Ok(())
    }

    async fn delete_dashboard_task(&self, user_id: &str, task_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(tasks) = inner.dashboard_tasks.get_mut(user_id) {
            tasks.retain(|task| task.id != task_id);
        }
        Ok(())
    }
}
