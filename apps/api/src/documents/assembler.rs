//! Stamp and receipt generation.
//!
//! Pipeline: validate input, load the case aggregate, resolve variables,
//! substitute, lay out and render off the async runtime, upload the payload, then
//! record the `generated_documents` row (and the receipt) in one transaction.
//! Nothing is recorded unless the full payload was built and stored. Sub-task
//! state is never touched here; callers merge what they need into its metadata.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::AuditEvent;
use crate::auth::OfficeContext;
use crate::cases::{load_case_aggregate, CaseAggregate};
use crate::documents::storage::payload_key;
use crate::documents::types::require_active_document_type;
use crate::errors::AppError;
use crate::fees::{resolve_fee, FeeLookup};
use crate::layout::{render_document, DocumentAssets, HeaderBlock, PageConfig, RenderedDocument};
use crate::models::document::{GeneratedDocumentRow, PaymentMethod, ReceiptRow};
use crate::state::AppState;
use crate::template::{referenced_tokens, substitute, validate_template};
use crate::variables::resolver::ALL_KEYS;
use crate::variables::spanish::{date_in_words, format_amount};
use crate::variables::{resolve_variables, Variables};

pub const RECEIPT_CATEGORY: &str = "receipt";
pub const RECEIPT_NAME: &str = "Comprobante de pago";

// ────────────────────────────────────────────────────────────────────────────
// Requests / responses
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StampRequest {
    pub document_type_id: Uuid,
    /// Replaces the document type's template for this one document.
    pub template_override: Option<String>,
    /// Allow the bank-wide fee when the case lawyer has no entry of their own.
    #[serde(default)]
    pub fee_fallback: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptRequest {
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StampResponse {
    pub document: GeneratedDocumentRow,
    /// Fee for the case's bank, lawyer and this document type, if one resolves.
    pub resolved_fee: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub document: GeneratedDocumentRow,
    pub receipt: ReceiptRow,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub text: String,
    pub variables: Variables,
    /// Tokens in the template that no variable answers; they render as "".
    pub unrecognized_tokens: Vec<String>,
}

/// Header plus substituted body, ready for layout.
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub header: HeaderBlock,
    pub body: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Pure assembly
// ────────────────────────────────────────────────────────────────────────────

pub fn build_stamp(agg: &CaseAggregate, template: &str) -> Result<(DocumentDraft, Variables), AppError> {
    validate_template(template)?;
    let vars = resolve_variables(agg);
    let draft = DocumentDraft {
        header: HeaderBlock::from_variables(&vars),
        body: substitute(template, &vars),
    };
    Ok((draft, vars))
}

pub fn build_receipt(
    agg: &CaseAggregate,
    amount: i64,
    method: PaymentMethod,
    reference: Option<&str>,
    date: NaiveDate,
) -> Result<DocumentDraft, AppError> {
    if amount < 0 {
        return Err(AppError::Validation(format!(
            "receipt amount must be non-negative, got {amount}"
        )));
    }
    let vars = resolve_variables(agg);
    let concept = agg
        .sub_task
        .as_ref()
        .map(|t| t.task_type.as_str())
        .unwrap_or("diligencia");

    let mut lines = vec![
        RECEIPT_NAME.to_uppercase(),
        String::new(),
        format!("Recibí la suma de $ {} por concepto de {concept}.", format_amount(amount)),
        format!("Forma de pago: {}", method.label()),
    ];
    if let Some(reference) = reference.map(str::trim).filter(|r| !r.is_empty()) {
        lines.push(format!("Referencia: {reference}"));
    }
    lines.push(format!("Fecha: {}", date_in_words(date)));
    lines.push(String::new());
    lines.push(String::new());
    lines.push("Receptor Judicial".to_string());

    Ok(DocumentDraft {
        header: HeaderBlock::from_variables(&vars),
        body: lines.join("\n"),
    })
}

/// Tokens a template uses that are not variable names.
pub fn unrecognized_tokens(template: &str) -> Vec<String> {
    referenced_tokens(template)
        .into_iter()
        .filter(|t| !ALL_KEYS.contains(&t.as_str()))
        .collect()
}

/// Runs layout and PDF rendering on the blocking pool.
pub async fn render_off_thread(
    draft: DocumentDraft,
    config: PageConfig,
    assets: DocumentAssets,
) -> Result<RenderedDocument, AppError> {
    tokio::task::spawn_blocking(move || {
        render_document(Some(&draft.header), &draft.body, &config, &assets)
    })
    .await
    .map_err(|e| AppError::Render(format!("layout task failed: {e}")))?
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence
// ────────────────────────────────────────────────────────────────────────────

struct NewDocument<'a> {
    case_id: Uuid,
    sub_task_id: Option<Uuid>,
    document_type_id: Option<Uuid>,
    name: &'a str,
    category: &'a str,
}

struct NewReceipt<'a> {
    amount: i64,
    method: PaymentMethod,
    reference: Option<&'a str>,
}

/// Uploads the payload, then records it. If recording fails the upload is
/// removed again, best-effort.
async fn persist(
    state: &AppState,
    ctx: &OfficeContext,
    doc: NewDocument<'_>,
    rendered: RenderedDocument,
    receipt: Option<NewReceipt<'_>>,
) -> Result<(GeneratedDocumentRow, Option<ReceiptRow>), AppError> {
    let document_id = Uuid::new_v4();
    let key = payload_key(ctx.office_id, doc.case_id, document_id);
    let page_count = i32::try_from(rendered.page_count)
        .map_err(|_| AppError::Render(format!("too many pages: {}", rendered.page_count)))?;

    state.payloads.put(&key, rendered.pdf).await?;

    match record(state, ctx, document_id, &key, page_count, &doc, receipt.as_ref()).await {
        Ok(rows) => Ok(rows),
        Err(e) => {
            if let Err(cleanup) = state.payloads.delete(&key).await {
                warn!("Could not remove orphaned payload {key}: {cleanup}");
            }
            Err(e)
        }
    }
}

async fn record(
    state: &AppState,
    ctx: &OfficeContext,
    document_id: Uuid,
    key: &str,
    page_count: i32,
    doc: &NewDocument<'_>,
    receipt: Option<&NewReceipt<'_>>,
) -> Result<(GeneratedDocumentRow, Option<ReceiptRow>), AppError> {
    let mut tx = state.db.begin().await?;

    // Serializes version numbering per case.
    let locked: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM cases WHERE id = $1 AND office_id = $2 FOR UPDATE")
            .bind(doc.case_id)
            .bind(ctx.office_id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(AppError::NotFound(format!("Case {} not found", doc.case_id)));
    }

    let document = sqlx::query_as::<_, GeneratedDocumentRow>(
        r#"
        INSERT INTO generated_documents
            (id, office_id, case_id, sub_task_id, document_type_id, name, category,
             payload_key, page_count, version, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                (SELECT COALESCE(MAX(version), 0) + 1 FROM generated_documents
                 WHERE case_id = $3
                   AND sub_task_id IS NOT DISTINCT FROM $4
                   AND document_type_id IS NOT DISTINCT FROM $5
                   AND category = $7),
                $10)
        RETURNING *
        "#,
    )
    .bind(document_id)
    .bind(ctx.office_id)
    .bind(doc.case_id)
    .bind(doc.sub_task_id)
    .bind(doc.document_type_id)
    .bind(doc.name)
    .bind(doc.category)
    .bind(key)
    .bind(page_count)
    .bind(ctx.user_id)
    .fetch_one(&mut *tx)
    .await?;

    let receipt_row = match receipt {
        Some(r) => Some(
            sqlx::query_as::<_, ReceiptRow>(
                "INSERT INTO receipts
                    (office_id, case_id, sub_task_id, document_id, amount, payment_method, reference)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING *",
            )
            .bind(ctx.office_id)
            .bind(doc.case_id)
            .bind(doc.sub_task_id)
            .bind(document.id)
            .bind(r.amount)
            .bind(r.method.as_str())
            .bind(r.reference)
            .fetch_one(&mut *tx)
            .await?,
        ),
        None => None,
    };

    tx.commit().await?;
    Ok((document, receipt_row))
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_stamp(
    state: &AppState,
    ctx: &OfficeContext,
    case_id: Uuid,
    sub_task_id: Uuid,
    req: StampRequest,
) -> Result<StampResponse, AppError> {
    let doc_type = require_active_document_type(&state.db, ctx.office_id, req.document_type_id).await?;
    let template = req
        .template_override
        .as_deref()
        .unwrap_or(&doc_type.template_body);

    let agg = load_case_aggregate(&state.db, ctx.office_id, case_id, Some(sub_task_id)).await?;
    let (draft, _) = build_stamp(&agg, template)?;
    let rendered =
        render_off_thread(draft, state.page_config.clone(), state.assets.clone()).await?;

    let resolved_fee = match agg.case.bank_id {
        Some(bank_id) => resolve_fee(
            state.fees.as_ref(),
            ctx.office_id,
            bank_id,
            doc_type.id,
            agg.case.lawyer_id,
            FeeLookup::from_fallback_flag(req.fee_fallback),
        )
        .await?
        .map(|entry| entry.amount),
        None => None,
    };

    let (document, _) = persist(
        state,
        ctx,
        NewDocument {
            case_id,
            sub_task_id: Some(sub_task_id),
            document_type_id: Some(doc_type.id),
            name: &doc_type.name,
            category: &doc_type.category,
        },
        rendered,
        None,
    )
    .await?;

    info!(
        "Generated stamp {} '{}' v{} ({} pages) for case {case_id}",
        document.id, document.name, document.version, document.page_count
    );
    state.audit.record(
        AuditEvent::new(ctx, "generate_stamp", "generated_document", document.id).with_detail(json!({
            "case_id": case_id,
            "sub_task_id": sub_task_id,
            "document_type_id": doc_type.id,
            "version": document.version,
            "template_override": req.template_override.is_some(),
        })),
    );
    Ok(StampResponse {
        document,
        resolved_fee,
    })
}

pub async fn generate_receipt(
    state: &AppState,
    ctx: &OfficeContext,
    case_id: Uuid,
    sub_task_id: Uuid,
    req: ReceiptRequest,
) -> Result<ReceiptResponse, AppError> {
    if req.amount < 0 {
        return Err(AppError::Validation(format!(
            "receipt amount must be non-negative, got {}",
            req.amount
        )));
    }
    let agg = load_case_aggregate(&state.db, ctx.office_id, case_id, Some(sub_task_id)).await?;
    let draft = build_receipt(
        &agg,
        req.amount,
        req.payment_method,
        req.reference.as_deref(),
        Utc::now().date_naive(),
    )?;
    let rendered =
        render_off_thread(draft, state.page_config.clone(), state.assets.clone()).await?;

    let (document, receipt) = persist(
        state,
        ctx,
        NewDocument {
            case_id,
            sub_task_id: Some(sub_task_id),
            document_type_id: None,
            name: RECEIPT_NAME,
            category: RECEIPT_CATEGORY,
        },
        rendered,
        Some(NewReceipt {
            amount: req.amount,
            method: req.payment_method,
            reference: req.reference.as_deref(),
        }),
    )
    .await?;
    let receipt = receipt.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("receipt row missing after insert"))
    })?;

    info!(
        "Generated receipt {} for case {case_id}: {} via {}",
        receipt.id,
        format_amount(receipt.amount),
        receipt.payment_method
    );
    state.audit.record(
        AuditEvent::new(ctx, "generate_receipt", "receipt", receipt.id).with_detail(json!({
            "case_id": case_id,
            "sub_task_id": sub_task_id,
            "document_id": document.id,
            "amount": receipt.amount,
        })),
    );
    Ok(ReceiptResponse { document, receipt })
}

/// Resolve and substitute only; used to fill a sub-task's draft text.
pub async fn preview_stamp(
    state: &AppState,
    ctx: &OfficeContext,
    case_id: Uuid,
    sub_task_id: Uuid,
    req: StampRequest,
) -> Result<PreviewResponse, AppError> {
    let doc_type = require_active_document_type(&state.db, ctx.office_id, req.document_type_id).await?;
    let template = req
        .template_override
        .as_deref()
        .unwrap_or(&doc_type.template_body);

    let agg = load_case_aggregate(&state.db, ctx.office_id, case_id, Some(sub_task_id)).await?;
    let (draft, variables) = build_stamp(&agg, template)?;
    Ok(PreviewResponse {
        text: draft.body,
        variables,
        unrecognized_tokens: unrecognized_tokens(template),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
