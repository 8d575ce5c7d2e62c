use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditEvent;
use crate::auth::OfficeContext;
use crate::cases::aggregate::fetch_case;
use crate::cases::metadata::MetadataPatch;
use crate::cases::status::sync_case_status;
use crate::cases::subtasks::{
    create_sub_task, delete_sub_task, patch_sub_task_metadata, update_sub_task,
    CreateSubTaskRequest, SubTaskMutation, UpdateSubTaskRequest,
};
use crate::errors::AppError;
use crate::models::case::{CaseRow, CaseStatus, SubTaskRow};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CaseView {
    pub case: CaseRow,
    pub sub_tasks: Vec<SubTaskRow>,
}

#[derive(Serialize)]
pub struct CaseStatusResponse {
    pub case_id: Uuid,
    pub status: CaseStatus,
}

/// GET /api/v1/cases/:case_id
pub async fn handle_get_case(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(case_id): Path<Uuid>,
) -> Result<Json<CaseView>, AppError> {
    let case = fetch_case(&state.db, ctx.office_id, case_id).await?;
    let sub_tasks = sqlx::query_as::<_, SubTaskRow>(
        "SELECT * FROM sub_tasks WHERE case_id = $1 ORDER BY scheduled_date NULLS LAST, created_at",
    )
    .bind(case_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(CaseView { case, sub_tasks }))
}

/// POST /api/v1/cases/:case_id/sync-status
pub async fn handle_sync_status(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(case_id): Path<Uuid>,
) -> Result<Json<CaseStatusResponse>, AppError> {
    let mut tx = state.db.begin().await?;
    let status = sync_case_status(&mut tx, ctx.office_id, case_id).await?;
    tx.commit().await?;

    info!("Synced case {case_id}: {status}");
    state.audit.record(
        AuditEvent::new(&ctx, "sync_status", "case", case_id).with_detail(json!({"status": status})),
    );
    Ok(Json(CaseStatusResponse { case_id, status }))
}

/// POST /api/v1/cases/:case_id/subtasks
pub async fn handle_create_sub_task(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(case_id): Path<Uuid>,
    Json(req): Json<CreateSubTaskRequest>,
) -> Result<(StatusCode, Json<SubTaskMutation>), AppError> {
    let mutation = create_sub_task(&state.db, state.audit.as_ref(), &ctx, case_id, req).await?;
    Ok((StatusCode::CREATED, Json(mutation)))
}

/// PATCH /api/v1/subtasks/:id
pub async fn handle_update_sub_task(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSubTaskRequest>,
) -> Result<Json<SubTaskMutation>, AppError> {
    let mutation = update_sub_task(&state.db, state.audit.as_ref(), &ctx, id, req).await?;
    Ok(Json(mutation))
}

/// PATCH /api/v1/subtasks/:id/metadata
pub async fn handle_patch_metadata(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(id): Path<Uuid>,
    Json(patch): Json<MetadataPatch>,
) -> Result<Json<SubTaskMutation>, AppError> {
    let mutation = patch_sub_task_metadata(&state.db, state.audit.as_ref(), &ctx, id, patch).await?;
    Ok(Json(mutation))
}

/// DELETE /api/v1/subtasks/:id
pub async fn handle_delete_sub_task(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = delete_sub_task(&state.db, state.audit.as_ref(), &ctx, id).await?;
    Ok(Json(json!({ "deleted": id, "case_status": status })))
}
