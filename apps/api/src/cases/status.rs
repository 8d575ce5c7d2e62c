//! Case status synchronizer.
//!
//! A case's status is a pure function of its sub-task statuses:
//! no sub-tasks → pending, all completed → done, otherwise in_progress.
//! `archived` is terminal and survives any sub-task change.

use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::case::{CaseStatus, SubTaskStatus};

/// Derives the aggregate status from the current one and the sub-task statuses.
pub fn derive_case_status(current: CaseStatus, sub_tasks: &[SubTaskStatus]) -> CaseStatus {
    if current == CaseStatus::Archived {
        return CaseStatus::Archived;
    }
    if sub_tasks.is_empty() {
        CaseStatus::Pending
    } else if sub_tasks.iter().all(|s| *s == SubTaskStatus::Completed) {
        CaseStatus::Done
    } else {
        CaseStatus::InProgress
    }
}

/// Recomputes and stores the case status on an open connection.
///
/// Callers pass the transaction of the triggering mutation (`&mut *tx`) so the
/// status never lags behind the sub-tasks. The case row is locked for the rest of
/// the transaction. Idempotent.
pub async fn sync_case_status(
    conn: &mut PgConnection,
    office_id: Uuid,
    case_id: Uuid,
) -> Result<CaseStatus, AppError> {
    let current: Option<String> =
        sqlx::query_scalar("SELECT status FROM cases WHERE id = $1 AND office_id = $2 FOR UPDATE")
            .bind(case_id)
            .bind(office_id)
            .fetch_optional(&mut *conn)
            .await?;
    let current = current.ok_or_else(|| AppError::NotFound(format!("Case {case_id} not found")))?;
    let current = parse_status::<CaseStatus>(&current)?;

    let raw: Vec<String> = sqlx::query_scalar("SELECT status FROM sub_tasks WHERE case_id = $1")
        .bind(case_id)
        .fetch_all(&mut *conn)
        .await?;
    let sub_tasks = raw
        .iter()
        .map(|s| parse_status::<SubTaskStatus>(s))
        .collect::<Result<Vec<_>, _>>()?;

    let derived = derive_case_status(current, &sub_tasks);
    if derived != current {
        sqlx::query("UPDATE cases SET status = $1, updated_at = now() WHERE id = $2")
            .bind(derived.as_str())
            .bind(case_id)
            .execute(&mut *conn)
            .await?;
        info!("Case {case_id} status {current} -> {derived}");
    }
    Ok(derived)
}

fn parse_status<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T, AppError> {
    raw.parse::<T>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt status column: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubTaskStatus::{Completed, Failed, Pending};

    #[test]
    fn test_no_sub_tasks_is_pending() {
        assert_eq!(
            derive_case_status(CaseStatus::InProgress, &[]),
            CaseStatus::Pending
        );
    }

    #[test]
    fn test_all_completed_is_done() {
        assert_eq!(
            derive_case_status(CaseStatus::Pending, &[Completed]),
            CaseStatus::Done
        );
        assert_eq!(
            derive_case_status(CaseStatus::InProgress, &[Completed, Completed]),
            CaseStatus::Done
        );
    }

    #[test]
    fn test_mixed_is_in_progress() {
        assert_eq!(
            derive_case_status(CaseStatus::Pending, &[Completed, Pending]),
            CaseStatus::InProgress
        );
        assert_eq!(
            derive_case_status(CaseStatus::Done, &[Failed]),
            CaseStatus::InProgress
        );
    }

    #[test]
    fn test_done_case_reopens_when_a_pending_task_is_added() {
        assert_eq!(
            derive_case_status(CaseStatus::Done, &[Completed, Pending]),
            CaseStatus::InProgress
        );
    }

    #[test]
    fn test_archived_is_terminal() {
        for tasks in [vec![], vec![Completed], vec![Pending, Failed]] {
            assert_eq!(
                derive_case_status(CaseStatus::Archived, &tasks),
                CaseStatus::Archived
            );
        }
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let tasks = [Completed, Pending];
        let first = derive_case_status(CaseStatus::Pending, &tasks);
        let second = derive_case_status(first, &tasks);
        assert_eq!(first, second);
    }
}
