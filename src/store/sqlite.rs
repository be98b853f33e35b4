use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqlitePool;

use crate::models::{
    ApplicationDocument, ApplicationStatus, ChecklistItem, DashboardTask, GlobalTask, HiddenReason,
    LetterStatus, ProgramId, ProgramRelationship, RecommendationLetter, TaskCategory, TaskStatus,
};
use crate::store::{ApplicationStore, StoreError};

/// SQLite-backed implementation of the persistence port.
///
/// Runtime-checked queries throughout; the combined operations
/// (`upsert_relationship_with_items`, `replace_checklist`,
/// `delete_target_records`) run inside a transaction.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {ts:?}: {e}")))
}

fn parse_date(date: &str) -> Result<NaiveDate, StoreError> {
    date.parse()
        .map_err(|e| StoreError::Corrupt(format!("bad date {date:?}: {e}")))
}

#[derive(sqlx::FromRow)]
struct RelationshipRow {
    program_id: String,
    is_target: bool,
    status: String,
    notes: String,
    progress: i64,
    saved_at: String,
}

impl TryFrom<RelationshipRow> for ProgramRelationship {
    type Error = StoreError;

    fn try_from(row: RelationshipRow) -> Result<Self, StoreError> {
        let status = ApplicationStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status {:?}", row.status)))?;
        Ok(ProgramRelationship {
            program_id: ProgramId::new(row.program_id),
            is_target: row.is_target,
            status,
            notes: row.notes,
            progress: row.progress as u8,
            saved_at: parse_timestamp(&row.saved_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChecklistItemRow {
    item_id: String,
    label: String,
    completed: bool,
    is_default: bool,
    hidden: bool,
    hidden_reason: Option<String>,
}

impl TryFrom<ChecklistItemRow> for ChecklistItem {
    type Error = StoreError;

    fn try_from(row: ChecklistItemRow) -> Result<Self, StoreError> {
        let hidden_reason = row
            .hidden_reason
            .as_deref()
            .map(|reason| {
                HiddenReason::parse(reason).ok_or_else(|| {
                    StoreError::Corrupt(format!("unknown hidden reason {reason:?}"))
                })
            })
            .transpose()?;
        Ok(ChecklistItem {
            id: row.item_id,
            label: row.label,
            completed: row.completed,
            is_default: row.is_default,
            hidden: row.hidden,
            hidden_reason,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LetterRow {
    letter_id: String,
    program_id: String,
    recommender_name: String,
    recommender_email: Option<String>,
    status: String,
    requested_at: String,
}

impl TryFrom<LetterRow> for RecommendationLetter {
    type Error = StoreError;

    fn try_from(row: LetterRow) -> Result<Self, StoreError> {
        let status = LetterStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown letter status {:?}", row.status)))?;
        Ok(RecommendationLetter {
            id: row.letter_id,
            program_id: ProgramId::new(row.program_id),
            recommender_name: row.recommender_name,
            recommender_email: row.recommender_email,
            status,
            requested_at: parse_timestamp(&row.requested_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    document_id: String,
    program_id: String,
    name: String,
    kind: String,
    uploaded_at: String,
}

impl TryFrom<DocumentRow> for ApplicationDocument {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, StoreError> {
        Ok(ApplicationDocument {
            id: row.document_id,
            program_id: ProgramId::new(row.program_id),
            name: row.name,
            kind: row.kind,
            uploaded_at: parse_timestamp(&row.uploaded_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GlobalTaskRow {
    task_id: String,
    task: String,
    category: String,
    status: String,
    due_date: Option<String>,
    linked_program_id: Option<String>,
    triggers_checklist_sync: bool,
    checklist_item_ids: String,
}

impl TryFrom<GlobalTaskRow> for GlobalTask {
    type Error = StoreError;

    fn try_from(row: GlobalTaskRow) -> Result<Self, StoreError> {
        let category = TaskCategory::parse(&row.category)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown category {:?}", row.category)))?;
        let status = TaskStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown task status {:?}", row.status)))?;
        let due_date = row.due_date.as_deref().map(parse_date).transpose()?;
        let checklist_item_ids = serde_json::from_str(&row.checklist_item_ids)
            .map_err(|e| StoreError::Corrupt(format!("bad checklist item id list: {e}")))?;
        Ok(GlobalTask {
            id: row.task_id,
            task: row.task,
            category,
            status,
            due_date,
            linked_program_id: row.linked_program_id.map(ProgramId::new),
            triggers_checklist_sync: row.triggers_checklist_sync,
            checklist_item_ids,
        })
    }
}

async fn upsert_relationship_in<'e, E>(
    executor: E,
    user_id: &str,
    rel: &ProgramRelationship,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO relationships (user_id, program_id, is_target, status, notes, progress, saved_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(user_id, program_id) DO UPDATE SET \
            is_target = excluded.is_target, \
            status = excluded.status, \
            notes = excluded.notes, \
            progress = excluded.progress",
    )
    .bind(user_id)
    .bind(rel.program_id.as_str())
    .bind(rel.is_target)
    .bind(rel.status.as_str())
    .bind(&rel.notes)
    .bind(i64::from(rel.progress))
    .bind(rel.saved_at.to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

async fn upsert_item_in<'e, E>(
    executor: E,
    user_id: &str,
    program_id: &ProgramId,
    item: &ChecklistItem,
    position: Option<i64>,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO checklist_items \
            (user_id, program_id, item_id, label, completed, is_default, hidden, hidden_reason, position) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, \
            (SELECT COALESCE(MAX(position) + 1, 0) FROM checklist_items \
             WHERE user_id = ? AND program_id = ?))) \
         ON CONFLICT(user_id, program_id, item_id) DO UPDATE SET \
            label = excluded.label, \
            completed = excluded.completed, \
            hidden = excluded.hidden, \
            hidden_reason = excluded.hidden_reason",
    )
    .bind(user_id)
    .bind(program_id.as_str())
    .bind(&item.id)
    .bind(&item.label)
    .bind(item.completed)
    .bind(item.is_default)
    .bind(item.hidden)
    .bind(item.hidden_reason.map(|r| r.as_str()))
    .bind(position)
    .bind(user_id)
    .bind(program_id.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl ApplicationStore for SqliteStore {
    async fn list_relationships(
        &self,
        user_id: &str,
    ) -> Result<Vec<ProgramRelationship>, StoreError> {
        let rows = sqlx::query_as::<_, RelationshipRow>(
            "SELECT program_id, is_target, status, notes, progress, saved_at \
             FROM relationships WHERE user_id = ? ORDER BY saved_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProgramRelationship::try_from).collect()
    }

    async fn upsert_relationship(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
    ) -> Result<(), StoreError> {
        upsert_relationship_in(&self.pool, user_id, rel).await?;
        Ok(())
    }

    async fn delete_relationship(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM relationships WHERE user_id = ? AND program_id = ?")
            .bind(user_id)
            .bind(program_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_checklist_items(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<ChecklistItem>, StoreError> {
        let rows = sqlx::query_as::<_, ChecklistItemRow>(
            "SELECT item_id, label, completed, is_default, hidden, hidden_reason \
             FROM checklist_items WHERE user_id = ? AND program_id = ? ORDER BY position",
        )
        .bind(user_id)
        .bind(program_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ChecklistItem::try_from).collect()
    }

    async fn upsert_checklist_items(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            upsert_item_in(&mut *tx, user_id, program_id, item, None).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_checklist_item(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        item_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM checklist_items WHERE user_id = ? AND program_id = ? AND item_id = ?",
        )
        .bind(user_id)
        .bind(program_id.as_str())
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_relationship_with_items(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            upsert_item_in(&mut *tx, user_id, &rel.program_id, item, None).await?;
        }
        upsert_relationship_in(&mut *tx, user_id, rel).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_checklist(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM checklist_items WHERE user_id = ? AND program_id = ?")
            .bind(user_id)
            .bind(rel.program_id.as_str())
            .execute(&mut *tx)
            .await?;
        for (position, item) in items.iter().enumerate() {
            upsert_item_in(&mut *tx, user_id, &rel.program_id, item, Some(position as i64))
                .await?;
        }
        upsert_relationship_in(&mut *tx, user_id, rel).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_target_records(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for table in [
            "checklist_items",
            "recommendation_letters",
            "application_documents",
        ] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE user_id = ? AND program_id = ?"
            ))
            .bind(user_id)
            .bind(program_id.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_letters(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<RecommendationLetter>, StoreError> {
        let rows = sqlx::query_as::<_, LetterRow>(
            "SELECT letter_id, program_id, recommender_name, recommender_email, status, requested_at \
             FROM recommendation_letters WHERE user_id = ? AND program_id = ? ORDER BY requested_at",
        )
        .bind(user_id)
        .bind(program_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RecommendationLetter::try_from).collect()
    }

    async fn upsert_letter(
        &self,
        user_id: &str,
        letter: &RecommendationLetter,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO recommendation_letters \
                (user_id, program_id, letter_id, recommender_name, recommender_email, status, requested_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, program_id, letter_id) DO UPDATE SET \
                recommender_name = excluded.recommender_name, \
                recommender_email = excluded.recommender_email, \
                status = excluded.status",
        )
        .bind(user_id)
        .bind(letter.program_id.as_str())
        .bind(&letter.id)
        .bind(&letter.recommender_name)
        .bind(&letter.recommender_email)
        .bind(letter.status.as_str())
        .bind(letter.requested_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_letter(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        letter_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM recommendation_letters \
             WHERE user_id = ? AND program_id = ? AND letter_id = ?",
        )
        .bind(user_id)
        .bind(program_id.as_str())
        .bind(letter_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_documents(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<ApplicationDocument>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT document_id, program_id, name, kind, uploaded_at \
             FROM application_documents WHERE user_id = ? AND program_id = ? ORDER BY uploaded_at",
        )
        .bind(user_id)
        .bind(program_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ApplicationDocument::try_from).collect()
    }

    async fn upsert_document(
        &self,
        user_id: &str,
        document: &ApplicationDocument,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO application_documents \
                (user_id, program_id, document_id, name, kind, uploaded_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, program_id, document_id) DO UPDATE SET \
                name = excluded.name, \
                kind = excluded.kind",
        )
        .bind(user_id)
        .bind(document.program_id.as_str())
        .bind(&document.id)
        .bind(&document.name)
        .bind(&document.kind)
        .bind(document.uploaded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_document(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        document_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM application_documents \
             WHERE user_id = ? AND program_id = ? AND document_id = ?",
        )
        .bind(user_id)
        .bind(program_id.as_str())
        .bind(document_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_global_tasks(&self, user_id: &str) -> Result<Vec<GlobalTask>, StoreError> {
        let rows = sqlx::query_as::<_, GlobalTaskRow>(
            "SELECT task_id, task, category, status, due_date, linked_program_id, \
                    triggers_checklist_sync, checklist_item_ids \
             FROM global_tasks WHERE user_id = ? ORDER BY rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(GlobalTask::try_from).collect()
    }

    async fn upsert_global_task(
        &self,
        user_id: &str,
        task: &GlobalTask,
    ) -> Result<(), StoreError> {
        let item_ids = serde_json::to_string(&task.checklist_item_ids)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            "INSERT INTO global_tasks \
                (user_id, task_id, task, category, status, due_date, linked_program_id, \
                 triggers_checklist_sync, checklist_item_ids) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, task_id) DO UPDATE SET \
                task = excluded.task, \
                status = excluded.status, \
                due_date = excluded.due_date, \
                linked_program_id = excluded.linked_program_id",
        )
        .bind(user_id)
        .bind(&task.id)
        .bind(&task.task)
        .bind(task.category.as_str())
        .bind(task.status.as_str())
        .bind(task.due_date.map(|d| d.to_string()))
        .bind(task.linked_program_id.as_ref().map(|id| id.as_str().to_string()))
        .bind(task.triggers_checklist_sync)
        .bind(item_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_global_task(&self, user_id: &str, task_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM global_tasks WHERE user_id = ? AND task_id = ?")
            .bind(user_id)
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_dashboard_tasks(&self, user_id: &str) -> Result<Vec<DashboardTask>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, bool)>(
            "SELECT task_id, task, completed FROM dashboard_tasks \
             WHERE user_id = ? ORDER BY rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, task, completed)| DashboardTask { id, task, completed })
            .collect())
    }

    async fn upsert_dashboard_task(
        &self,
        user_id: &str,
        task: &DashboardTask,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO dashboard_tasks (user_id, task_id, task, completed) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id, task_id) DO UPDATE SET \
                task = excluded.task, \
                completed = excluded.completed",
        )
        .bind(user_id)
        .bind(&task.id)
        .bind(&task.task)
        .bind(task.completed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_dashboard_task(&self, user_id: &str, task_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM dashboard_tasks WHERE user_id = ? AND task_id = ?")
            .bind(user_id)
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
