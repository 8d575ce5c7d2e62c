//! Document types: named templates, unique per office by name.

use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink};
use crate::auth::OfficeContext;
use crate::errors::AppError;
use crate::models::document::DocumentTypeRow;
use crate::template::validate_template;

const ENTITY: &str = "document_type";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentTypeRequest {
    pub name: String,
    pub category: String,
    pub template_body: String,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentTypeRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub template_body: Option<String>,
    pub active: Option<bool>,
}

fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl CreateDocumentTypeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        required("name", &self.name)?;
        required("category", &self.category)?;
        validate_template(&self.template_body)
    }
}

impl UpdateDocumentTypeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            required("name", name)?;
        }
        if let Some(category) = &self.category {
            required("category", category)?;
        }
        if let Some(body) = &self.template_body {
            validate_template(body)?;
        }
        Ok(())
    }
}

fn duplicate_name(name: &str) -> AppError {
    AppError::Conflict(format!("a document type named '{name}' already exists; edit it instead"))
}

pub async fn list_document_types(pool: &PgPool, office_id: Uuid) -> Result<Vec<DocumentTypeRow>, AppError> {
    let rows = sqlx::query_as::<_, DocumentTypeRow>(
        "SELECT * FROM document_types WHERE office_id = $1 ORDER BY category, name",
    )
    .bind(office_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn fetch_document_type(
    pool: &PgPool,
    office_id: Uuid,
    id: Uuid,
) -> Result<Option<DocumentTypeRow>, AppError> {
    let row = sqlx::query_as::<_, DocumentTypeRow>(
        "SELECT * FROM document_types WHERE id = $1 AND office_id = $2",
    )
    .bind(id)
    .bind(office_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// A document type usable for generation: unknown or inactive ids are input errors.
pub async fn require_active_document_type(
    pool: &PgPool,
    office_id: Uuid,
    id: Uuid,
) -> Result<DocumentTypeRow, AppError> {
    match fetch_document_type(pool, office_id, id).await? {
        Some(row) if row.active => Ok(row),
        Some(_) => Err(AppError::Validation(format!("document type {id} is inactive"))),
        None => Err(AppError::Validation(format!("unknown document type {id}"))),
    }
}

async fn name_taken(
    pool: &PgPool,
    office_id: Uuid,
    name: &str,
    except: Option<Uuid>,
) -> Result<bool, AppError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM document_types
                        WHERE office_id = $1 AND name = $2 AND ($3::uuid IS NULL OR id <> $3))",
    )
    .bind(office_id)
    .bind(name)
    .bind(except)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

pub async fn create_document_type(
    pool: &PgPool,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    req: CreateDocumentTypeRequest,
) -> Result<DocumentTypeRow, AppError> {
    req.validate()?;
    let name = req.name.trim();
    if name_taken(pool, ctx.office_id, name, None).await? {
        return Err(duplicate_name(name));
    }

    let row = sqlx::query_as::<_, DocumentTypeRow>(
        "INSERT INTO document_types (office_id, name, category, template_body, active)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(ctx.office_id)
    .bind(name)
    .bind(req.category.trim())
    .bind(&req.template_body)
    .bind(req.active.unwrap_or(true))
    .fetch_one(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => duplicate_name(name),
        other => other,
    })?;

    info!("Created document type {} '{}'", row.id, row.name);
    audit.record(
        AuditEvent::new(ctx, "create", ENTITY, row.id)
            .with_detail(json!({"name": row.name, "category": row.category})),
    );
    Ok(row)
}

pub async fn update_document_type(
    pool: &PgPool,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    id: Uuid,
    req: UpdateDocumentTypeRequest,
) -> Result<DocumentTypeRow, AppError> {
    req.validate()?;
    let name = req.name.as_deref().map(str::trim);
    if let Some(name) = name {
        if name_taken(pool, ctx.office_id, name, Some(id)).await? {
            return Err(duplicate_name(name));
        }
    }

    let row = sqlx::query_as::<_, DocumentTypeRow>(
        "UPDATE document_types SET
            name = COALESCE($3, name),
            category = COALESCE($4, category),
            template_body = COALESCE($5, template_body),
            active = COALESCE($6, active),
            updated_at = now()
         WHERE id = $1 AND office_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(ctx.office_id)
    .bind(name)
    .bind(req.category.as_deref().map(str::trim))
    .bind(req.template_body.as_deref())
    .bind(req.active)
    .fetch_optional(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => duplicate_name(name.unwrap_or_default()),
        other => other,
    })?
    .ok_or_else(|| AppError::NotFound(format!("Document type {id} not found")))?;

    info!("Updated document type {} (active {})", row.id, row.active);
    audit.record(AuditEvent::new(ctx, "update", ENTITY, row.id).with_detail(json!({"name": row.name})));
    Ok(row)
}
