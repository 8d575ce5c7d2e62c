use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::case::{CaseRow, SubTaskRow};
use crate::models::reference::{BankRow, CourtRow, LawyerRow, OfficeRow, PartyRow};

/// Everything document generation needs to know about one case.
#[derive(Debug, Clone)]
pub struct CaseAggregate {
    pub office: OfficeRow,
    pub case: CaseRow,
    pub court: Option<CourtRow>,
    pub lawyer: Option<LawyerRow>,
    pub bank: Option<BankRow>,
    /// Opposing parties in display order.
    pub parties: Vec<PartyRow>,
    pub sub_task: Option<SubTaskRow>,
}

/// Fetches a case scoped to the caller's office.
pub async fn fetch_case(pool: &PgPool, office_id: Uuid, case_id: Uuid) -> Result<CaseRow, AppError> {
    sqlx::query_as::<_, CaseRow>("SELECT * FROM cases WHERE id = $1 AND office_id = $2")
        .bind(case_id)
        .bind(office_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Case {case_id} not found")))
}

/// Fetches a sub-task, checking that it belongs to the given case.
pub async fn fetch_sub_task(
    pool: &PgPool,
    case_id: Uuid,
    sub_task_id: Uuid,
) -> Result<SubTaskRow, AppError> {
    sqlx::query_as::<_, SubTaskRow>("SELECT * FROM sub_tasks WHERE id = $1 AND case_id = $2")
        .bind(sub_task_id)
        .bind(case_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Sub-task {sub_task_id} not found")))
}

/// Loads a case with its court, lawyer, bank, opposing parties and optionally one sub-task.
pub async fn load_case_aggregate(
    pool: &PgPool,
    office_id: Uuid,
    case_id: Uuid,
    sub_task_id: Option<Uuid>,
) -> Result<CaseAggregate, AppError> {
    let case = fetch_case(pool, office_id, case_id).await?;

    let office = sqlx::query_as::<_, OfficeRow>("SELECT id, name FROM offices WHERE id = $1")
        .bind(office_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Office {office_id} not found")))?;

    let sub_task = match sub_task_id {
        Some(id) => Some(fetch_sub_task(pool, case_id, id).await?),
        None => None,
    };

    let court = match case.court_id {
        Some(id) => {
            sqlx::query_as::<_, CourtRow>("SELECT id, name FROM courts WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let lawyer = match case.lawyer_id {
        Some(id) => {
            sqlx::query_as::<_, LawyerRow>("SELECT id, name, address FROM lawyers WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let bank = match case.bank_id {
        Some(id) => {
            sqlx::query_as::<_, BankRow>("SELECT id, name FROM banks WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let parties = sqlx::query_as::<_, PartyRow>(
        r#"
        SELECT p.id, p.case_id, p.name, p.rut, p.address, c.name AS commune
        FROM parties p
        LEFT JOIN communes c ON c.id = p.commune_id
        WHERE p.case_id = $1
        ORDER BY p.position, p.created_at
        "#,
    )
    .bind(case_id)
    .fetch_all(pool)
    .await?;

    Ok(CaseAggregate {
        office,
        case,
        court,
        lawyer,
        bank,
        parties,
        sub_task,
    })
}
