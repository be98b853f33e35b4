use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use applytrack::catalog::StaticCatalog;
use applytrack::error::AppError;
use applytrack::models::{
    ApplicationDocument, ApplicationStatus, ChecklistItem, DashboardTask, GlobalTask,
    GlobalTaskTemplate, HiddenReason, NewDocumentRequest, NewLetterRequest, Program, ProgramId,
    ProgramRelationship, RecommendationLetter, TaskCategory, TaskStatus,
    UpdateRelationshipRequest,
};
use applytrack::services::Engine;
use applytrack::store::{ApplicationStore, MemoryStore, StoreError};

fn program(id: &str, school: &str, deadline: Option<&str>, gre: bool, ccrn: bool) -> Program {
    Program {
        id: ProgramId::new(id),
        school_name: school.to_string(),
        program_name: "Nurse Anesthesia DNP".to_string(),
        application_deadline: deadline.map(|d| d.parse().expect("bad deadline")),
        gre_required: gre,
        ccrn_required: ccrn,
        city: None,
        state: None,
    }
}

async fn engine_with(programs: Vec<Program>) -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let catalog = Arc::new(StaticCatalog::new(programs));
    let engine = Engine::load("test-user".to_string(), store.clone(), catalog)
        .await
        .expect("engine load");
    (engine, store)
}

fn pid(id: &str) -> ProgramId {
    ProgramId::new(id)
}

#[tokio::test]
async fn save_is_idempotent_and_carries_no_checklist() {
    let (engine, _) = engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;

    let first = engine.save_program(&pid("a")).await.expect("save");
    assert!(!first.is_target);
    assert_eq!(first.progress, 0);

    let second = engine.save_program(&pid("a")).await.expect("second save");
    assert_eq!(second.saved_at, first.saved_at);

    let entry = engine.relationship(&pid("a")).await.expect("entry");
    assert!(entry.checklist.is_empty());
}

#[tokio::test]
async fn saving_unknown_program_is_not_found() {
    let (engine, _) = engine_with(vec![]).await;
    let err = engine.save_program(&pid("ghost")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn convert_generates_defaults_from_requirement_flags() {
    let (engine, _) = engine_with(vec![program("a", "Duke", Some("2025-05-01"), false, true)]).await;

    let rel = engine
        .convert_to_target(&pid("a"))
        .await
        .expect("convert")
        .expect("known program");
    assert!(rel.is_target);
    assert_eq!(rel.progress, 0);

    let entry = engine.relationship(&pid("a")).await.expect("entry");
    assert_eq!(entry.checklist.len(), 8);
    assert_eq!(entry.visible_checklist.len(), 6);
    assert_eq!(entry.hidden_checklist.len(), 2);
    for id in ["c5", "c6"] {
        let item = entry.checklist.iter().find(|i| i.id == id).expect("gre item");
        assert!(item.hidden);
        assert_eq!(item.hidden_reason, Some(HiddenReason::SchoolNotRequired));
    }
    let ccrn = entry.checklist.iter().find(|i| i.id == "c7").expect("ccrn item");
    assert!(!ccrn.hidden);
    assert!(entry.checklist.iter().all(|i| i.is_default && !i.completed));
}

#[tokio::test]
async fn converting_unknown_program_is_a_silent_no_op() {
    let (engine, _) = engine_with(vec![]).await;
    let rel = engine.convert_to_target(&pid("ghost")).await.expect("no error");
    assert!(rel.is_none());
}

#[tokio::test]
async fn reconversion_regenerates_checklist_deterministically() {
    let (engine, _) = engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    engine
        .set_checklist_item(&pid("a"), "c1", true)
        .await
        .expect("toggle");
    engine
        .add_checklist_item(&pid("a"), "Shadow a CRNA".to_string())
        .await
        .expect("custom");

    engine.convert_to_target(&pid("a")).await.expect("reconvert");

    let entry = engine.relationship(&pid("a")).await.expect("entry");
    assert_eq!(entry.checklist.len(), 8);
    assert!(entry.checklist.iter().all(|i| !i.completed));
    assert!(entry.hidden_checklist.is_empty());
    assert_eq!(entry.progress, 0);
}

#[tokio::test]
async fn toggle_recomputes_and_persists_progress() {
    let (engine, store) =
        engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    let update = engine
        .set_checklist_item(&pid("a"), "c1", true)
        .await
        .expect("toggle c1");
    assert_eq!(update.progress, 13); // 1/8
    let update = engine
        .set_checklist_item(&pid("a"), "c2", true)
        .await
        .expect("toggle c2");
    assert_eq!(update.progress, 25);

    // the port saw item and progress as one unit
    let stored_rel = store
        .list_relationships("test-user")
        .await
        .expect("list")
        .into_iter()
        .find(|r| r.program_id == pid("a"))
        .expect("stored relationship");
    assert_eq!(stored_rel.progress, 25);
    let stored_items = store
        .list_checklist_items("test-user", &pid("a"))
        .await
        .expect("items");
    assert!(stored_items.iter().find(|i| i.id == "c2").expect("c2").completed);
}

#[tokio::test]
async fn repeating_a_toggle_request_is_idempotent() {
    let (engine, _) = engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    let first = engine
        .set_checklist_item(&pid("a"), "c1", true)
        .await
        .expect("set");
    let repeat = engine
        .set_checklist_item(&pid("a"), "c1", true)
        .await
        .expect("repeat");
    assert_eq!(first.progress, repeat.progress);
    assert!(repeat.item.completed);
}

#[tokio::test]
async fn custom_items_are_capped_at_three() {
    let (engine, _) = engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    for label in ["Shadow a CRNA", "Retake statistics", "Visit campus"] {
        engine
            .add_checklist_item(&pid("a"), label.to_string())
            .await
            .expect("custom add");
    }
    let err = engine
        .add_checklist_item(&pid("a"), "One more".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded));

    let entry = engine.relationship(&pid("a")).await.expect("entry");
    assert_eq!(entry.checklist.len(), 11);
}

#[tokio::test]
async fn default_items_cannot_be_deleted() {
    let (engine, _) = engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    let err = engine
        .remove_checklist_item(&pid("a"), "c1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvariantViolation(_)));

    let entry = engine.relationship(&pid("a")).await.expect("entry");
    assert_eq!(entry.checklist.len(), 8);
    assert!(entry.checklist.iter().all(|i| i.is_default));
}

#[tokio::test]
async fn removing_a_custom_item_recomputes_progress() {
    let (engine, _) = engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    let update = engine
        .add_checklist_item(&pid("a"), "Shadow a CRNA".to_string())
        .await
        .expect("custom add");
    engine
        .set_checklist_item(&pid("a"), "c1", true)
        .await
        .expect("toggle");
    // 1/9 completed
    let entry = engine.relationship(&pid("a")).await.expect("entry");
    assert_eq!(entry.progress, 11);

    let progress = engine
        .remove_checklist_item(&pid("a"), &update.item.id)
        .await
        .expect("remove custom");
    assert_eq!(progress, 13); // back to 1/8
}

#[tokio::test]
async fn hiding_and_revealing_recomputes_the_denominator() {
    let (engine, _) = engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    for id in ["c1", "c2", "c3", "c4", "c5", "c6", "c7"] {
        engine
            .set_checklist_item(&pid("a"), id, true)
            .await
            .expect("toggle");
    }
    let entry = engine.relationship(&pid("a")).await.expect("entry");
    assert_eq!(entry.progress, 88); // 7/8

    let update = engine
        .hide_checklist_item(&pid("a"), "c8", HiddenReason::UserHidden)
        .await
        .expect("hide");
    assert_eq!(update.progress, 100);
    assert!(!update.item.completed);

    // hiding a completed item must not drag a full checklist below 100
    let update = engine
        .hide_checklist_item(&pid("a"), "c7", HiddenReason::UserHidden)
        .await
        .expect("hide completed");
    assert_eq!(update.progress, 100);

    let update = engine
        .reveal_checklist_item(&pid("a"), "c8")
        .await
        .expect("reveal");
    assert_eq!(update.progress, 86); // 6/7 visible
    assert_eq!(update.item.hidden_reason, None);
}

#[tokio::test]
async fn checklist_operations_require_a_target() {
    let (engine, _) = engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.save_program(&pid("a")).await.expect("save");

    let err = engine
        .set_checklist_item(&pid("a"), "c1", true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvariantViolation(_)));
}

#[tokio::test]
async fn revert_destroys_all_target_state() {
    let (engine, store) =
        engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");
    engine
        .set_checklist_item(&pid("a"), "c1", true)
        .await
        .expect("toggle");
    engine
        .update_relationship(
            &pid("a"),
            UpdateRelationshipRequest {
                status: Some(ApplicationStatus::InProgress),
                notes: Some("call admissions".to_string()),
            },
        )
        .await
        .expect("update");
    engine
        .add_letter(
            &pid("a"),
            NewLetterRequest {
                recommender_name: "Dr. Alvarez".to_string(),
                recommender_email: None,
            },
        )
        .await
        .expect("letter");
    engine
        .add_document(
            &pid("a"),
            NewDocumentRequest {
                name: "resume.pdf".to_string(),
                kind: "resume".to_string(),
            },
        )
        .await
        .expect("document");

    let rel = engine.revert_to_saved(&pid("a")).await.expect("revert");
    assert!(!rel.is_target);
    assert_eq!(rel.progress, 0);
    assert_eq!(rel.notes, "");
    assert_eq!(rel.status, ApplicationStatus::Researching);

    let entry = engine.relationship(&pid("a")).await.expect("entry");
    assert!(entry.checklist.is_empty());
    assert!(entry.letters.is_empty());
    assert!(entry.documents.is_empty());

    assert!(store
        .list_checklist_items("test-user", &pid("a"))
        .await
        .expect("items")
        .is_empty());
    assert!(store
        .list_letters("test-user", &pid("a"))
        .await
        .expect("letters")
        .is_empty());
}

#[tokio::test]
async fn remove_deletes_the_relationship_and_sub_records() {
    let (engine, store) =
        engine_with(vec![program("a", "Rush", Some("2025-03-01"), true, true)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    engine.remove_program(&pid("a")).await.expect("remove");
    let err = engine.relationship(&pid("a")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    assert!(store
        .list_relationships("test-user")
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn sync_marks_items_across_programs_including_hidden_ones() {
    let (engine, _) = engine_with(vec![
        program("a", "Rush", Some("2025-03-01"), true, true),
        program("b", "Duke", Some("2025-05-01"), false, true),
    ])
    .await;
    engine.convert_to_target(&pid("a")).await.expect("convert a");
    engine.convert_to_target(&pid("b")).await.expect("convert b");

    let task = engine
        .add_global_task(GlobalTaskTemplate {
            task: "Take the GRE".to_string(),
            category: TaskCategory::Gre,
            weeks_before_deadline: 4,
            triggers_checklist_sync: true,
            checklist_item_ids: vec!["c5".to_string(), "c6".to_string()],
        })
        .await
        .expect("task");
    let task = engine.complete_global_task(&task.id).await.expect("complete");
    assert_eq!(task.status, TaskStatus::Completed);

    let report = engine
        .sync_checklist_items(&task.checklist_item_ids, true)
        .await
        .expect("sync");
    assert_eq!(report.completed.len(), 2);
    assert!(report.failed.is_empty());

    // A requires the GRE: items visible, progress moves
    let a = engine.relationship(&pid("a")).await.expect("a");
    assert_eq!(a.progress, 25);
    for id in ["c5", "c6"] {
        let item = a.visible_checklist.iter().find(|i| i.id == id).expect("item");
        assert!(item.completed);
    }

    // B does not: items stay hidden and out of progress, but are completed underneath
    let b = engine.relationship(&pid("b")).await.expect("b");
    assert_eq!(b.progress, 0);
    for id in ["c5", "c6"] {
        let item = b.hidden_checklist.iter().find(|i| i.id == id).expect("item");
        assert!(item.completed);
        assert!(item.hidden);
    }
}

#[tokio::test]
async fn earliest_deadline_picks_the_nearest_qualifying_target() {
    let (engine, _) = engine_with(vec![
        program("a", "Rush", Some("2025-03-01"), true, true),
        program("b", "Duke", Some("2025-05-01"), false, true),
        program("c", "Emory", Some("2025-01-01"), false, false),
    ])
    .await;
    for id in ["a", "b", "c"] {
        engine.convert_to_target(&pid(id)).await.expect("convert");
    }

    let source = engine
        .earliest_deadline_for_category(TaskCategory::Ccrn)
        .await
        .expect("deadline")
        .expect("some source");
    assert_eq!(source.program_id, pid("a"));
    assert_eq!(source.school_name, "Rush");
    assert_eq!(source.deadline, NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"));

    let task = engine
        .add_global_task(GlobalTaskTemplate {
            task: "Renew CCRN".to_string(),
            category: TaskCategory::Ccrn,
            weeks_before_deadline: 4,
            triggers_checklist_sync: false,
            checklist_item_ids: vec![],
        })
        .await
        .expect("task");
    assert_eq!(
        task.due_date,
        Some(NaiveDate::from_ymd_opt(2025, 2, 1).expect("date"))
    );
    assert_eq!(task.linked_program_id, Some(pid("a")));
}

#[tokio::test]
async fn task_without_a_resolvable_deadline_is_undated_but_completable() {
    let (engine, _) = engine_with(vec![program("a", "Emory", Some("2025-04-10"), false, false)]).await;
    engine.convert_to_target(&pid("a")).await.expect("convert");

    let task = engine
        .add_global_task(GlobalTaskTemplate {
            task: "Take the GRE".to_string(),
            category: TaskCategory::Gre,
            weeks_before_deadline: 4,
            triggers_checklist_sync: true,
            checklist_item_ids: vec!["c5".to_string(), "c6".to_string()],
        })
        .await
        .expect("task");
    assert_eq!(task.due_date, None);
    assert_eq!(task.linked_program_id, None);

    let completed = engine.complete_global_task(&task.id).await.expect("complete");
    assert_eq!(completed.status, TaskStatus::Completed);

    // completing again is a no-op
    let again = engine.complete_global_task(&task.id).await.expect("repeat");
    assert_eq!(again.status, TaskStatus::Completed);
}

#[tokio::test]
async fn dashboard_tasks_have_no_deadline_derivation() {
    let (engine, _) = engine_with(vec![]).await;

    let task = engine
        .add_dashboard_task("Research CRNA programs".to_string())
        .await
        .expect("add");
    assert!(!task.completed);

    let task = engine
        .set_dashboard_task(&task.id, true)
        .await
        .expect("complete");
    assert!(task.completed);

    engine.delete_dashboard_task(&task.id).await.expect("delete");
    assert!(engine.dashboard_tasks().await.is_empty());
}

/// Port wrapper that rejects combined writes for one program, to exercise
/// partial fan-out failure.
struct FailingStore {
    inner: MemoryStore,
    fail_for: ProgramId,
}

#[async_trait]
impl ApplicationStore for FailingStore {
    async fn list_relationships(
        &self,
        user_id: &str,
    ) -> Result<Vec<ProgramRelationship>, StoreError> {
        self.inner.list_relationships(user_id).await
    }

    async fn upsert_relationship(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
    ) -> Result<(), StoreError> {
        self.inner.upsert_relationship(user_id, rel).await
    }

    async fn delete_relationship(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<(), StoreError> {
        self.inner.delete_relationship(user_id, program_id).await
    }

    async fn list_checklist_items(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<ChecklistItem>, StoreError> {
        self.inner.list_checklist_items(user_id, program_id).await
    }

    async fn upsert_checklist_items(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        self.inner
            .upsert_checklist_items(user_id, program_id, items)
            .await
    }

    async fn delete_checklist_item(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        item_id: &str,
    ) -> Result<(), StoreError> {
        self.inner
            .delete_checklist_item(user_id, program_id, item_id)
            .await
    }

    async fn upsert_relationship_with_items(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        if rel.program_id == self.fail_for {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        self.inner
            .upsert_relationship_with_items(user_id, rel, items)
            .await
    }

    async fn replace_checklist(
        &self,
        user_id: &str,
        rel: &ProgramRelationship,
        items: &[ChecklistItem],
    ) -> Result<(), StoreError> {
        self.inner.replace_checklist(user_id, rel, items).await
    }

    async fn delete_target_records(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<(), StoreError> {
        self.inner.delete_target_records(user_id, program_id).await
    }

    async fn list_letters(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<RecommendationLetter>, StoreError> {
        self.inner.list_letters(user_id, program_id).await
    }

    async fn upsert_letter(
        &self,
        user_id: &str,
        letter: &RecommendationLetter,
    ) -> Result<(), StoreError> {
        self.inner.upsert_letter(user_id, letter).await
    }

    async fn delete_letter(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        letter_id: &str,
    ) -> Result<(), StoreError> {
        self.inner.delete_letter(user_id, program_id, letter_id).await
    }

    async fn list_documents(
        &self,
        user_id: &str,
        program_id: &ProgramId,
    ) -> Result<Vec<ApplicationDocument>, StoreError> {
        self.inner.list_documents(user_id, program_id).await
    }

    async fn upsert_document(
        &self,
        user_id: &str,
        document: &ApplicationDocument,
    ) -> Result<(), StoreError> {
        self.inner.upsert_document(user_id, document).await
    }

    async fn delete_document(
        &self,
        user_id: &str,
        program_id: &ProgramId,
        document_id: &str,
    ) -> Result<(), StoreError> {
        self.inner
            .delete_document(user_id, program_id, document_id)
            .await
    }

    async fn list_global_tasks(&self, user_id: &str) -> Result<Vec<GlobalTask>, StoreError> {
        self.inner.list_global_tasks(user_id).await
    }

    async fn upsert_global_task(
        &self,
        user_id: &str,
        task: &GlobalTask,
    ) -> Result<(), StoreError> {
        self.inner.upsert_global_task(user_id, task).await
    }

    async fn delete_global_task(&self, user_id: &str, task_id: &str) -> Result<(), StoreError> {
        self.inner.delete_global_task(user_id, task_id).await
    }

    async fn list_dashboard_tasks(&self, user_id: &str) -> Result<Vec<DashboardTask>, StoreError> {
        self.inner.list_dashboard_tasks(user_id).await
    }

    async fn upsert_dashboard_task(
        &self,
        user_id: &str,
        task: &DashboardTask,
    ) -> Result<(), StoreError> {
        self.inner.upsert_dashboard_task(user_id, task).await
    }

    async fn delete_dashboard_task(&self, user_id: &str, task_id: &str) -> Result<(), StoreError> {
        self.inner.delete_dashboard_task(user_id, task_id).await
    }
}

#[tokio::test]
async fn partial_sync_failure_names_the_failed_programs() {
    let store = Arc::new(FailingStore {
        inner: MemoryStore::new(),
        fail_for: pid("b"),
    });
    let catalog = Arc::new(StaticCatalog::new(vec![
        program("a", "Rush", Some("2025-03-01"), true, true),
        program("b", "Pitt", Some("2025-06-15"), true, true),
    ]));
    let engine = Engine::load("test-user".to_string(), store, catalog)
        .await
        .expect("engine load");

    // conversion also goes through replace_checklist, which succeeds for both
    engine.convert_to_target(&pid("a")).await.expect("convert a");
    engine.convert_to_target(&pid("b")).await.expect("convert b");

    let item_ids = vec!["c5".to_string(), "c6".to_string()];
    let err = engine.sync_checklist_items(&item_ids, true).await.unwrap_err();
    let AppError::SyncIncomplete { completed, failed } = err else {
        panic!("expected SyncIncomplete");
    };
    assert_eq!(completed, vec![pid("a")]);
    assert_eq!(failed, vec![pid("b")]);

    // the successful write stayed committed, the failed one rolled nothing in
    let a = engine.relationship(&pid("a")).await.expect("a");
    assert_eq!(a.progress, 25);
    let b = engine.relationship(&pid("b")).await.expect("b");
    assert_eq!(b.progress, 0);
    assert!(b.checklist.iter().filter(|i| i.id == "c5" || i.id == "c6").all(|i| !i.completed));
}
