use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink};
use crate::auth::OfficeContext;
use crate::errors::AppError;
use crate::fees::repository::{FeeChanges, FeeRepository, NewFeeEntry};
use crate::models::fee::{FeeEntry, FeeKey};

const ENTITY: &str = "fee_entry";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFeeRequest {
    pub bank_id: Uuid,
    pub lawyer_id: Option<Uuid>,
    pub document_type_id: Uuid,
    pub amount: i64,
    pub active: Option<bool>,
}

/// Partial update. `bank_id` / `lawyer_id` are accepted only to be rejected:
/// the pairing is fixed once the entry exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFeeRequest {
    pub document_type_id: Option<Uuid>,
    pub amount: Option<i64>,
    pub active: Option<bool>,
    #[serde(default)]
    pub bank_id: Option<Uuid>,
    #[serde(default)]
    pub lawyer_id: Option<Uuid>,
}

fn validate_amount(amount: i64) -> Result<(), AppError> {
    if amount < 0 {
        return Err(AppError::Validation(format!(
            "fee amount must be non-negative, got {amount}"
        )));
    }
    Ok(())
}

fn conflict_message(key: &FeeKey) -> String {
    match key.lawyer_id {
        Some(lawyer) => format!(
            "a fee for lawyer {lawyer} and document type {} already exists for this bank; edit it instead",
            key.document_type_id
        ),
        None => format!(
            "a bank-wide fee for document type {} already exists for this bank; edit it instead",
            key.document_type_id
        ),
    }
}

pub async fn create_fee(
    repo: &dyn FeeRepository,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    req: CreateFeeRequest,
) -> Result<FeeEntry, AppError> {
    validate_amount(req.amount)?;
    let key = FeeKey {
        office_id: ctx.office_id,
        bank_id: req.bank_id,
        lawyer_id: req.lawyer_id,
        document_type_id: req.document_type_id,
    };

    if !repo.references_exist(&key).await? {
        return Err(AppError::Validation(
            "bank, lawyer or document type does not exist in this office".to_string(),
        ));
    }
    if repo.find(&key).await?.is_some() {
        return Err(AppError::Conflict(conflict_message(&key)));
    }

    // The unique indexes still decide a race past the pre-check.
    let entry = repo
        .insert(&NewFeeEntry {
            key,
            amount: req.amount,
            active: req.active.unwrap_or(true),
        })
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => AppError::Conflict(conflict_message(&key)),
            other => other,
        })?;

    info!(
        "Created fee entry {} (bank {}, lawyer {:?}, amount {})",
        entry.id, entry.bank_id, entry.lawyer_id, entry.amount
    );
    audit.record(
        AuditEvent::new(ctx, "create", ENTITY, entry.id).with_detail(json!({
            "bank_id": entry.bank_id,
            "lawyer_id": entry.lawyer_id,
            "document_type_id": entry.document_type_id,
            "amount": entry.amount,
        })),
    );
    Ok(entry)
}

pub async fn update_fee(
    repo: &dyn FeeRepository,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    id: Uuid,
    req: UpdateFeeRequest,
) -> Result<FeeEntry, AppError> {
    let current = repo
        .get(ctx.office_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fee entry {id} not found")))?;

    let bank_changed = req.bank_id.is_some_and(|bank| bank != current.bank_id);
    let lawyer_changed = req.lawyer_id.is_some_and(|lawyer| Some(lawyer) != current.lawyer_id);
    if bank_changed || lawyer_changed {
        return Err(AppError::Validation(
            "bank and lawyer of a fee entry are immutable; delete and recreate it".to_string(),
        ));
    }
    if let Some(amount) = req.amount {
        validate_amount(amount)?;
    }

    if let Some(document_type_id) = req.document_type_id {
        let key = FeeKey {
            document_type_id,
            ..current.key()
        };
        if document_type_id != current.document_type_id {
            if !repo.references_exist(&key).await? {
                return Err(AppError::Validation(format!(
                    "document type {document_type_id} does not exist in this office"
                )));
            }
            if repo.find(&key).await?.is_some_and(|other| other.id != id) {
                return Err(AppError::Conflict(conflict_message(&key)));
            }
        }
    }

    let changes = FeeChanges {
        document_type_id: req.document_type_id,
        amount: req.amount,
        active: req.active,
    };
    let entry = repo.update(ctx.office_id, id, &changes).await?;

    info!("Updated fee entry {} (amount {}, active {})", entry.id, entry.amount, entry.active);
    audit.record(
        AuditEvent::new(ctx, "update", ENTITY, entry.id).with_detail(json!({
            "previous_amount": current.amount,
            "amount": entry.amount,
            "active": entry.active,
            "document_type_id": entry.document_type_id,
        })),
    );
    Ok(entry)
}

pub async fn delete_fee(
    repo: &dyn FeeRepository,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    id: Uuid,
) -> Result<(), AppError> {
    if !repo.delete(ctx.office_id, id).await? {
        return Err(AppError::NotFound(format!("Fee entry {id} not found")));
    }
    info!("Deleted fee entry {id}");
    audit.record(AuditEvent::new(ctx, "delete", ENTITY, id));
    Ok(())
}
