use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::OfficeContext;
use crate::errors::AppError;
use crate::fees::resolver::{effective_entries, resolve_fee, FeeLookup};
use crate::fees::service::{create_fee, delete_fee, update_fee, CreateFeeRequest, UpdateFeeRequest};
use crate::models::fee::FeeEntry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListFeesQuery {
    pub bank_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResolveFeeQuery {
    pub bank_id: Uuid,
    pub document_type_id: Uuid,
    pub lawyer_id: Option<Uuid>,
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolvedFee {
    pub amount: i64,
    pub fee_entry_id: Uuid,
    /// False when the bank-wide entry answered the lookup.
    pub lawyer_specific: bool,
}

/// GET /api/v1/fees
///
/// Without `bank_id`: every entry of the office, inactive ones included.
/// With `bank_id`: the effective schedule for that bank and lawyer scope.
pub async fn handle_list_fees(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Query(params): Query<ListFeesQuery>,
) -> Result<Json<Vec<FeeEntry>>, AppError> {
    let entries = state.fees.list(ctx.office_id, params.bank_id).await?;
    if params.bank_id.is_none() {
        return Ok(Json(entries));
    }
    let lookup = FeeLookup::from_fallback_flag(params.fallback);
    Ok(Json(effective_entries(entries, params.lawyer_id, lookup)))
}

/// GET /api/v1/fees/resolve
pub async fn handle_resolve_fee(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Query(params): Query<ResolveFeeQuery>,
) -> Result<Json<ResolvedFee>, AppError> {
    let lookup = FeeLookup::from_fallback_flag(params.fallback);
    let entry = resolve_fee(
        state.fees.as_ref(),
        ctx.office_id,
        params.bank_id,
        params.document_type_id,
        params.lawyer_id,
        lookup,
    )
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "No active fee for bank {} and document type {}",
            params.bank_id, params.document_type_id
        ))
    })?;

    Ok(Json(ResolvedFee {
        amount: entry.amount,
        fee_entry_id: entry.id,
        lawyer_specific: entry.lawyer_id.is_some(),
    }))
}

/// POST /api/v1/fees
pub async fn handle_create_fee(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Json(req): Json<CreateFeeRequest>,
) -> Result<(StatusCode, Json<FeeEntry>), AppError> {
    let entry = create_fee(state.fees.as_ref(), state.audit.as_ref(), &ctx, req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PATCH /api/v1/fees/:id
pub async fn handle_update_fee(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFeeRequest>,
) -> Result<Json<FeeEntry>, AppError> {
    let entry = update_fee(state.fees.as_ref(), state.audit.as_ref(), &ctx, id, req).await?;
    Ok(Json(entry))
}

/// DELETE /api/v1/fees/:id
pub async fn handle_delete_fee(
    State(state): State<AppState>,
    ctx: OfficeContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_fee(state.fees.as_ref(), state.audit.as_ref(), &ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
