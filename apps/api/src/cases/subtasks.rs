//! Sub-task mutations. Each one runs the status synchronizer inside its own
//! transaction, so a committed sub-task change always comes with the matching
//! case status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink};
use crate::auth::OfficeContext;
use crate::cases::metadata::{merge_metadata, MetadataPatch};
use crate::cases::status::sync_case_status;
use crate::errors::AppError;
use crate::models::case::{CaseStatus, SubTaskRow, SubTaskStatus};

const ENTITY: &str = "sub_task";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubTaskRequest {
    pub task_type: String,
    pub status: Option<SubTaskStatus>,
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub metadata: MetadataPatch,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubTaskRequest {
    pub task_type: Option<String>,
    pub status: Option<SubTaskStatus>,
    pub scheduled_date: Option<NaiveDate>,
    /// Merged key-wise into the stored metadata.
    #[serde(default)]
    pub metadata: MetadataPatch,
}

/// A sub-task after a mutation, with the case status it produced.
#[derive(Debug, Serialize)]
pub struct SubTaskMutation {
    pub sub_task: SubTaskRow,
    pub case_status: CaseStatus,
}

/// Column values for an UPDATE, computed from the current row and a request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubTaskChanges {
    pub task_type: String,
    pub status: SubTaskStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub metadata: Value,
}

fn validate_task_type(task_type: &str) -> Result<(), AppError> {
    if task_type.trim().is_empty() {
        return Err(AppError::Validation("task_type cannot be empty".to_string()));
    }
    Ok(())
}

pub fn plan_update(current: &SubTaskRow, req: &UpdateSubTaskRequest) -> Result<SubTaskChanges, AppError> {
    if let Some(task_type) = &req.task_type {
        validate_task_type(task_type)?;
    }
    let status = match req.status {
        Some(status) => status,
        None => current
            .status
            .parse::<SubTaskStatus>()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt sub-task status: {e}")))?,
    };
    Ok(SubTaskChanges {
        task_type: req
            .task_type
            .clone()
            .unwrap_or_else(|| current.task_type.clone()),
        status,
        scheduled_date: req.scheduled_date.or(current.scheduled_date),
        metadata: merge_metadata(&current.metadata, &req.metadata),
    })
}

/// Locks a sub-task row, checking it belongs to a case of the office.
async fn lock_sub_task(
    conn: &mut PgConnection,
    office_id: Uuid,
    id: Uuid,
) -> Result<SubTaskRow, AppError> {
    sqlx::query_as::<_, SubTaskRow>(
        "SELECT s.* FROM sub_tasks s
         JOIN cases c ON c.id = s.case_id
         WHERE s.id = $1 AND c.office_id = $2
         FOR UPDATE OF s",
    )
    .bind(id)
    .bind(office_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Sub-task {id} not found")))
}

async fn write_changes(
    conn: &mut PgConnection,
    id: Uuid,
    changes: &SubTaskChanges,
) -> Result<SubTaskRow, AppError> {
    let row = sqlx::query_as::<_, SubTaskRow>(
        "UPDATE sub_tasks
         SET task_type = $2, status = $3, scheduled_date = $4, metadata = $5, updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&changes.task_type)
    .bind(changes.status.as_str())
    .bind(changes.scheduled_date)
    .bind(&changes.metadata)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn create_sub_task(
    pool: &PgPool,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    case_id: Uuid,
    req: CreateSubTaskRequest,
) -> Result<SubTaskMutation, AppError> {
    validate_task_type(&req.task_type)?;
    let status = req.status.unwrap_or(SubTaskStatus::Pending);
    let metadata = merge_metadata(&json!({}), &req.metadata);

    let mut tx = pool.begin().await?;
    let owned: Option<Uuid> = sqlx::query_scalar("SELECT id FROM cases WHERE id = $1 AND office_id = $2")
        .bind(case_id)
        .bind(ctx.office_id)
        .fetch_optional(&mut *tx)
        .await?;
    if owned.is_none() {
        return Err(AppError::NotFound(format!("Case {case_id} not found")));
    }

    let sub_task = sqlx::query_as::<_, SubTaskRow>(
        "INSERT INTO sub_tasks (case_id, task_type, status, scheduled_date, metadata)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(case_id)
    .bind(req.task_type.trim())
    .bind(status.as_str())
    .bind(req.scheduled_date)
    .bind(&metadata)
    .fetch_one(&mut *tx)
    .await?;

    let case_status = sync_case_status(&mut tx, ctx.office_id, case_id).await?;
    tx.commit().await?;

    info!("Created sub-task {} ({}) on case {case_id}", sub_task.id, sub_task.task_type);
    audit.record(
        AuditEvent::new(ctx, "create", ENTITY, sub_task.id)
            .with_detail(json!({"case_id": case_id, "task_type": sub_task.task_type, "status": status})),
    );
    Ok(SubTaskMutation {
        sub_task,
        case_status,
    })
}

pub async fn update_sub_task(
    pool: &PgPool,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    id: Uuid,
    req: UpdateSubTaskRequest,
) -> Result<SubTaskMutation, AppError> {
    let mut tx = pool.begin().await?;
    let current = lock_sub_task(&mut tx, ctx.office_id, id).await?;
    let changes = plan_update(&current, &req)?;
    let sub_task = write_changes(&mut tx, id, &changes).await?;
    let case_status = sync_case_status(&mut tx, ctx.office_id, current.case_id).await?;
    tx.commit().await?;

    info!("Updated sub-task {id} (status {})", sub_task.status);
    audit.record(AuditEvent::new(ctx, "update", ENTITY, id).with_detail(json!({
        "previous_status": current.status,
        "status": sub_task.status,
    })));
    Ok(SubTaskMutation {
        sub_task,
        case_status,
    })
}

/// Key-wise metadata merge. Unmentioned keys are kept.
pub async fn patch_sub_task_metadata(
    pool: &PgPool,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    id: Uuid,
    patch: MetadataPatch,
) -> Result<SubTaskMutation, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("metadata patch is empty".to_string()));
    }
    let keys: Vec<String> = patch.to_map().keys().cloned().chain(patch.clear.iter().cloned()).collect();
    update_sub_task(
        pool,
        audit,
        ctx,
        id,
        UpdateSubTaskRequest {
            metadata: patch,
            ..Default::default()
        },
    )
    .await
    .inspect(|_| info!("Merged metadata keys {keys:?} into sub-task {id}"))
}

pub async fn delete_sub_task(
    pool: &PgPool,
    audit: &dyn AuditSink,
    ctx: &OfficeContext,
    id: Uuid,
) -> Result<CaseStatus, AppError> {
    let mut tx = pool.begin().await?;
    let current = lock_sub_task(&mut tx, ctx.office_id, id).await?;
    sqlx::query("DELETE FROM sub_tasks WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let case_status = sync_case_status(&mut tx, ctx.office_id, current.case_id).await?;
    tx.commit().await?;

    info!("Deleted sub-task {id} from case {}", current.case_id);
    audit.record(
        AuditEvent::new(ctx, "delete", ENTITY, id).with_detail(json!({"case_id": current.case_id})),
    );
    Ok(case_status)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn row(status: &str, metadata: Value) -> SubTaskRow {
        SubTaskRow {
            id: Uuid::new_v4(),
            case_id: Uuid::new_v4(),
            task_type: "Notificación".to_string(),
            status: status.to_string(),
            metadata,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_update_keeps_unmentioned_fields() {
        let current = row("pending", json!({"draft_text": "borrador", "amount": 12000}));
        let changes = plan_update(
            &current,
            &UpdateSubTaskRequest {
                status: Some(SubTaskStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(changes.task_type, "Notificación");
        assert_eq!(changes.status, SubTaskStatus::Completed);
        assert_eq!(changes.scheduled_date, current.scheduled_date);
        assert_eq!(changes.metadata, current.metadata);
    }

    #[test]
    fn test_plan_update_merges_metadata_key_wise() {
        let current = row("pending", json!({"draft_text": "borrador", "amount": 12000}));
        let req = UpdateSubTaskRequest {
            metadata: MetadataPatch {
                execution_time: Some("10:30".to_string()),
                clear: vec!["draft_text".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let changes = plan_update(&current, &req).unwrap();
        assert_eq!(changes.metadata, json!({"amount": 12000, "execution_time": "10:30"}));
        // Same patch again: same result.
        let again = plan_update(
            &SubTaskRow {
                metadata: changes.metadata.clone(),
                ..current
            },
            &req,
        )
        .unwrap();
        assert_eq!(again.metadata, changes.metadata);
    }

    #[test]
    fn test_plan_update_rejects_blank_task_type() {
        let current = row("pending", json!({}));
        let result = plan_update(
            &current,
            &UpdateSubTaskRequest {
                task_type: Some("  ".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_plan_update_surfaces_corrupt_status() {
        let current = row("cancelled", json!({}));
        let result = plan_update(&current, &UpdateSubTaskRequest::default());
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateSubTaskRequest =
            serde_json::from_value(json!({"task_type": "Embargo"})).unwrap();
        assert!(req.status.is_none());
        assert!(req.metadata.is_empty());
    }
}
