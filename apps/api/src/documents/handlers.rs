use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::auth::OfficeContext;
use crate::documents::assembler::{
    generate_receipt, generate_stamp, preview_stamp, PreviewResponse, ReceiptRequest,
    ReceiptResponse, StampRequest, StampResponse,
};
use crate::documents::storage::PDF_CONTENT_TYPE;
use crate::documents::types::{
    create_document_type, list_document_types, update_document_type, CreateDocumentTypeRequest,
    UpdateDocumentTypeRequest,
};
use crate::errors::AppError;
use crate::models::document::{DocumentTypeRow, GeneratedDocumentRow};
use crate::state::AppState;

async fn fetch_generated_document(
    state: &AppState,
    office_id: Uuid,
    id: Uuid,
) -> Result<GeneratedDocumentRow, AppError> {
    sqlx::query_as::<_, GeneratedDocumentRow>(
        "SELECT * FROM generated_documents WHERE id = $1 AND office_id = $2",
    )
    .bind(id)
    .bind(office_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))
}

/// POST /api/v1/cases/:case_id/subtasks/:subtask_id/stamps
pub async fn handle_generate_stamp(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path((case_id, sub_task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<StampRequest>,
) -> Result<(StatusCode, Json<StampResponse>), AppError> {
    let response = generate_stamp(&state, &ctx, case_id, sub_task_id, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/cases/:case_id/subtasks/:subtask_id/stamps/preview
pub async fn handle_preview_stamp(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path((case_id, sub_task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<StampRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let preview = preview_stamp(&state, &ctx, case_id, sub_task_id, req).await?;
    Ok(Json(preview))
}

/// POST /api/v1/cases/:case_id/subtasks/:subtask_id/receipts
pub async fn handle_generate_receipt(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path((case_id, sub_task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ReceiptRequest>,
) -> Result<(StatusCode, Json<ReceiptResponse>), AppError> {
    let response = generate_receipt(&state, &ctx, case_id, sub_task_id, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedDocumentRow>, AppError> {
    Ok(Json(fetch_generated_document(&state, ctx.office_id, id).await?))
}

/// GET /api/v1/documents/:id/payload
pub async fn handle_get_payload(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = fetch_generated_document(&state, ctx.office_id, id).await?;
    let bytes = state.payloads.get(&document.payload_key).await?;
    let disposition = format!(
        "inline; filename=\"{}-v{}.pdf\"",
        document.id, document.version
    );
    Ok((
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// GET /api/v1/document-types
pub async fn handle_list_document_types(
    State(state): State<AppState>,
    ctx: OfficeContext,
) -> Result<Json<Vec<DocumentTypeRow>>, AppError> {
    Ok(Json(list_document_types(&state.db, ctx.office_id).await?))
}

/// POST /api/v1/document-types
pub async fn handle_create_document_type(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Json(req): Json<CreateDocumentTypeRequest>,
) -> Result<(StatusCode, Json<DocumentTypeRow>), AppError> {
    let row = create_document_type(&state.db, state.audit.as_ref(), &ctx, req).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/v1/document-types/:id
pub async fn handle_update_document_type(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDocumentTypeRequest>,
) -> Result<Json<DocumentTypeRow>, AppError> {
    let row = update_document_type(&state.db, state.audit.as_ref(), &ctx, id, req).await?;
    Ok(Json(row))
}
