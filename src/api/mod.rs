use axum::Json;
use axum::extract::Path;
use axum::routing::{delete, patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{
    ApplicationDocument, DashboardTask, GlobalTask, GlobalTaskTemplate, HiddenReason,
    NewChecklistItemRequest, NewDocumentRequest, NewLetterRequest, Program, ProgramId,
    ProgramRelationship, RecommendationLetter, UpdateRelationshipRequest,
};
use crate::services::{ChecklistUpdate, ProgramBoardEntry, SyncReport};
use crate::state::AppState;

#[derive(Deserialize)]
struct SetCompletedRequest {
    completed: bool,
}

#[derive(Deserialize)]
struct HideItemRequest {
    reason: Option<HiddenReason>,
}

#[derive(Deserialize)]
struct SyncItemsRequest {
    item_ids: Vec<String>,
    #[serde(default = "default_completed")]
    completed: bool,
}

fn default_completed() -> bool {
    true
}

#[derive(Deserialize)]
struct NewDashboardTaskRequest {
    task: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/programs", get(list_programs))
        .route("/programs/{id}", get(get_program))
        .route("/relationships", get(board))
        .route(
            "/relationships/{id}",
            get(get_relationship).patch(update_relationship).delete(remove_program),
        )
        .route("/relationships/{id}/save", post(save_program))
        .route("/relationships/{id}/target", post(convert_to_target))
        .route("/relationships/{id}/revert", post(revert_to_saved))
        .route("/relationships/{id}/checklist", post(add_checklist_item))
        .route(
            "/relationships/{id}/checklist/{item_id}",
            patch(set_checklist_item).delete(remove_checklist_item),
        )
        .route(
            "/relationships/{id}/checklist/{item_id}/hide",
            patch(hide_checklist_item),
        )
        .route(
            "/relationships/{id}/checklist/{item_id}/reveal",
            patch(reveal_checklist_item),
        )
        .route("/relationships/{id}/letters", post(add_letter))
        .route(
            "/relationships/{id}/letters/{letter_id}",
            patch(mark_letter_received).delete(remove_letter),
        )
        .route("/relationships/{id}/documents", post(add_document))
        .route(
            "/relationships/{id}/documents/{document_id}",
            delete(remove_document),
        )
        .route("/tasks", get(list_global_tasks).post(add_global_task))
        .route("/tasks/sync", post(sync_checklist_items))
        .route("/tasks/{id}", delete(delete_global_task))
        .route("/tasks/{id}/complete", post(complete_global_task))
        .route(
            "/dashboard-tasks",
            get(list_dashboard_tasks).post(add_dashboard_task),
        )
        .route(
            "/dashboard-tasks/{id}",
            patch(set_dashboard_task).delete(delete_dashboard_task),
        )
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_programs(State(state): State<AppState>) -> Result<Json<Vec<Program>>, AppError> {
    let programs = state.engine.list_programs().await?;
    Ok(Json(programs))
}

async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Program>, AppError> {
    let program = state
        .engine
        .get_program(&ProgramId::new(id))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(program))
}

async fn board(State(state): State<AppState>) -> Result<Json<Vec<ProgramBoardEntry>>, AppError> {
    let entries = state.engine.board().await?;
    Ok(Json(entries))
}

async fn get_relationship(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProgramBoardEntry>, AppError> {
    let entry = state.engine.relationship(&ProgramId::new(id)).await?;
    Ok(Json(entry))
}

async fn save_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProgramRelationship>, AppError> {
    let rel = state.engine.save_program(&ProgramId::new(id)).await?;
    Ok(Json(rel))
}

async fn convert_to_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProgramRelationship>, AppError> {
    let rel = state
        .engine
        .convert_to_target(&ProgramId::new(id))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(rel))
}

async fn revert_to_saved(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProgramRelationship>, AppError> {
    let rel = state.engine.revert_to_saved(&ProgramId::new(id)).await?;
    Ok(Json(rel))
}

async fn remove_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.remove_program(&ProgramId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_relationship(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRelationshipRequest>,
) -> Result<Json<ProgramRelationship>, AppError> {
    let rel = state
        .engine
        .update_relationship(&ProgramId::new(id), req)
        .await?;
    Ok(Json(rel))
}

async fn add_checklist_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewChecklistItemRequest>,
) -> Result<Json<ChecklistUpdate>, AppError> {
    let update = state
        .engine
        .add_checklist_item(&ProgramId::new(id), req.label)
        .await?;
    Ok(Json(update))
}

async fn set_checklist_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<SetCompletedRequest>,
) -> Result<Json<ChecklistUpdate>, AppError> {
    let update = state
        .engine
        .set_checklist_item(&ProgramId::new(id), &item_id, req.completed)
        .await?;
    Ok(Json(update))
}

async fn remove_checklist_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .engine
        .remove_checklist_item(&ProgramId::new(id), &item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn hide_checklist_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<HideItemRequest>,
) -> Result<Json<ChecklistUpdate>, AppError> {
    let reason = req.reason.unwrap_or(HiddenReason::UserHidden);
    let update = state
        .engine
        .hide_checklist_item(&ProgramId::new(id), &item_id, reason)
        .await?;
    Ok(Json(update))
}

async fn reveal_checklist_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<ChecklistUpdate>, AppError> {
    let update = state
        .engine
        .reveal_checklist_item(&ProgramId::new(id), &item_id)
        .await?;
    Ok(Json(update))
}

async fn add_letter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewLetterRequest>,
) -> Result<Json<RecommendationLetter>, AppError> {
    let letter = state.engine.add_letter(&ProgramId::new(id), req).await?;
    Ok(Json(letter))
}

async fn mark_letter_received(
    State(state): State<AppState>,
    Path((id, letter_id)): Path<(String, String)>,
) -> Result<Json<RecommendationLetter>, AppError> {
    let letter = state
        .engine
        .mark_letter_received(&ProgramId::new(id), &letter_id)
        .await?;
    Ok(Json(letter))
}

async fn remove_letter(
    State(state): State<AppState>,
    Path((id, letter_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .engine
        .remove_letter(&ProgramId::new(id), &letter_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewDocumentRequest>,
) -> Result<Json<ApplicationDocument>, AppError> {
    let document = state.engine.add_document(&ProgramId::new(id), req).await?;
    Ok(Json(document))
}

async fn remove_document(
    State(state): State<AppState>,
    Path((id, document_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .engine
        .remove_document(&ProgramId::new(id), &document_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_global_tasks(State(state): State<AppState>) -> Json<Vec<GlobalTask>> {
    Json(state.engine.global_tasks().await)
}

async fn add_global_task(
    State(state): State<AppState>,
    Json(template): Json<GlobalTaskTemplate>,
) -> Result<Json<GlobalTask>, AppError> {
    let task = state.engine.add_global_task(template).await?;
    Ok(Json(task))
}

async fn complete_global_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GlobalTask>, AppError> {
    let task = state.engine.complete_global_task(&id).await?;
    Ok(Json(task))
}

async fn delete_global_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_global_task(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn sync_checklist_items(
    State(state): State<AppState>,
    Json(req): Json<SyncItemsRequest>,
) -> Result<Json<SyncReport>, AppError> {
    let report = state
        .engine
        .sync_checklist_items(&req.item_ids, req.completed)
        .await?;
    Ok(Json(report))
}

async fn list_dashboard_tasks(State(state): State<AppState>) -> Json<Vec<DashboardTask>> {
    Json(state.engine.dashboard_tasks().await)
}

async fn add_dashboard_task(
    State(state): State<AppState>,
    Json(req): Json<NewDashboardTaskRequest>,
) -> Result<Json<DashboardTask>, AppError> {
    let task = state.engine.add_dashboard_task(req.task).await?;
    Ok(Json(task))
}

async fn set_dashboard_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetCompletedRequest>,
) -> Result<Json<DashboardTask>, AppError> {
    let task = state.engine.set_dashboard_task(&id, req.completed).await?;
    Ok(Json(task))
}

async fn delete_dashboard_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_dashboard_task(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
