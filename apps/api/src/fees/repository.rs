use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::fee::{FeeEntry, FeeKey};

const FEE_COLUMNS: &str = "id, office_id, bank_id, lawyer_id, document_type_id, amount, active, \
                           created_at, updated_at";

/// Fields of a fee entry about to be created.
#[derive(Debug, Clone)]
pub struct NewFeeEntry {
    pub key: FeeKey,
    pub amount: i64,
    pub active: bool,
}

/// Mutable fields of an existing entry. Bank and lawyer are fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct FeeChanges {
    pub document_type_id: Option<Uuid>,
    pub amount: Option<i64>,
    pub active: Option<bool>,
}

/// Storage seam for the fee schedule.
///
/// Implementations must reject a second row for the same [`FeeKey`] with
/// `AppError::Conflict`, atomically, whatever the pre-checks above them did.
#[async_trait]
pub trait FeeRepository: Send + Sync {
    async fn find(&self, key: &FeeKey) -> Result<Option<FeeEntry>, AppError>;

    async fn get(&self, office_id: Uuid, id: Uuid) -> Result<Option<FeeEntry>, AppError>;

    /// Every entry of the office, optionally restricted to one bank.
    async fn list(&self, office_id: Uuid, bank_id: Option<Uuid>) -> Result<Vec<FeeEntry>, AppError>;

    /// Whether bank, lawyer and document type all exist inside the office.
    async fn references_exist(&self, key: &FeeKey) -> Result<bool, AppError>;

    async fn insert(&self, new: &NewFeeEntry) -> Result<FeeEntry, AppError>;

    async fn update(
        &self,
        office_id: Uuid,
        id: Uuid,
        changes: &FeeChanges,
    ) -> Result<FeeEntry, AppError>;

    /// Returns `false` if nothing was deleted.
    async fn delete(&self, office_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgFeeRepository {
    pool: PgPool,
}

impl PgFeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeeRepository for PgFeeRepository {
    async fn find(&self, key: &FeeKey) -> Result<Option<FeeEntry>, AppError> {
        // `IS NOT DISTINCT FROM` so a NULL lawyer matches the bank-wide row.
        let entry = sqlx::query_as::<_, FeeEntry>(&format!(
            "SELECT {FEE_COLUMNS} FROM fee_entries
             WHERE office_id = $1 AND bank_id = $2
               AND lawyer_id IS NOT DISTINCT FROM $3
               AND document_type_id = $4"
        ))
        .bind(key.office_id)
        .bind(key.bank_id)
        .bind(key.lawyer_id)
        .bind(key.document_type_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn get(&self, office_id: Uuid, id: Uuid) -> Result<Option<FeeEntry>, AppError> {
        let entry = sqlx::query_as::<_, FeeEntry>(&format!(
            "SELECT {FEE_COLUMNS} FROM fee_entries WHERE id = $1 AND office_id = $2"
        ))
        .bind(id)
        .bind(office_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list(&self, office_id: Uuid, bank_id: Option<Uuid>) -> Result<Vec<FeeEntry>, AppError> {
        let entries = sqlx::query_as::<_, FeeEntry>(&format!(
            "SELECT {FEE_COLUMNS} FROM fee_entries
             WHERE office_id = $1 AND ($2::uuid IS NULL OR bank_id = $2)
             ORDER BY bank_id, document_type_id, lawyer_id NULLS FIRST"
        ))
        .bind(office_id)
        .bind(bank_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn references_exist(&self, key: &FeeKey) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM banks WHERE id = $2 AND office_id = $1)
                AND ($3::uuid IS NULL
                     OR EXISTS (SELECT 1 FROM lawyers WHERE id = $3 AND office_id = $1))
                AND EXISTS (SELECT 1 FROM document_types WHERE id = $4 AND office_id = $1)",
        )
        .bind(key.office_id)
        .bind(key.bank_id)
        .bind(key.lawyer_id)
        .bind(key.document_type_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, new: &NewFeeEntry) -> Result<FeeEntry, AppError> {
        let entry = sqlx::query_as::<_, FeeEntry>(&format!(
            "INSERT INTO fee_entries (office_id, bank_id, lawyer_id, document_type_id, amount, active)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {FEE_COLUMNS}"
        ))
        .bind(new.key.office_id)
        .bind(new.key.bank_id)
        .bind(new.key.lawyer_id)
        .bind(new.key.document_type_id)
        .bind(new.amount)
        .bind(new.active)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn update(
        &self,
        office_id: Uuid,
        id: Uuid,
        changes: &FeeChanges,
    ) -> Result<FeeEntry, AppError> {
        let entry = sqlx::query_as::<_, FeeEntry>(&format!(
            "UPDATE fee_entries SET
                document_type_id = COALESCE($3, document_type_id),
                amount = COALESCE($4, amount),
                active = COALESCE($5, active),
                updated_at = now()
             WHERE id = $1 AND office_id = $2
             RETURNING {FEE_COLUMNS}"
        ))
        .bind(id)
        .bind(office_id)
        .bind(changes.document_type_id)
        .bind(changes.amount)
        .bind(changes.active)
        .fetch_optional(&self.pool)
        .await?;
        entry.ok_or_else(|| AppError::NotFound(format!("Fee entry {id} not found")))
    }

    async fn delete(&self, office_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM fee_entries WHERE id = $1 AND office_id = $2")
            .bind(id)
            .bind(office_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory (tests)
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    /// Mirrors the two partial unique indexes of `fee_entries`.
    #[derive(Default)]
    pub(crate) struct MemoryFeeRepository {
        entries: Mutex<Vec<FeeEntry>>,
        /// (office, id) pairs of banks, lawyers and document types.
        references: Mutex<HashSet<(Uuid, Uuid)>>,
    }

    impl MemoryFeeRepository {
        pub(crate) fn with_references(office_id: Uuid, ids: &[Uuid]) -> Self {
            let repo = Self::default();
            repo.references
                .lock()
                .unwrap()
                .extend(ids.iter().map(|id| (office_id, *id)));
            repo
        }

        fn conflict(entries: &[FeeEntry], key: &FeeKey, except: Option<Uuid>) -> bool {
            entries
                .iter()
                .any(|e| e.key() == *key && Some(e.id) != except)
        }
    }

    #[async_trait]
    impl FeeRepository for MemoryFeeRepository {
        async fn find(&self, key: &FeeKey) -> Result<Option<FeeEntry>, AppError> {
            let entries = self.entries.lock().unwrap();
            Ok(entries.iter().find(|e| e.key() == *key).cloned())
        }

        async fn get(&self, office_id: Uuid, id: Uuid) -> Result<Option<FeeEntry>, AppError> {
            let entries = self.entries.lock().unwrap();
            Ok(entries
                .iter()
                .find(|e| e.id == id && e.office_id == office_id)
                .cloned())
        }

        async fn list(
            &self,
            office_id: Uuid,
            bank_id: Option<Uuid>,
        ) -> Result<Vec<FeeEntry>, AppError> {
            let entries = self.entries.lock().unwrap();
            Ok(entries
                .iter()
                .filter(|e| e.office_id == office_id && bank_id.map_or(true, |b| e.bank_id == b))
                .cloned()
                .collect())
        }

        async fn references_exist(&self, key: &FeeKey) -> Result<bool, AppError> {
            let refs = self.references.lock().unwrap();
            let has = |id: Uuid| refs.contains(&(key.office_id, id));
            Ok(has(key.bank_id)
                && key.lawyer_id.map_or(true, |id| has(id))
                && has(key.document_type_id))
        }

        async fn insert(&self, new: &NewFeeEntry) -> Result<FeeEntry, AppError> {
            let mut entries = self.entries.lock().unwrap();
            if Self::conflict(&entries, &new.key, None) {
                return Err(AppError::Conflict("duplicate fee entry".to_string()));
            }
            let now = Utc::now();
            let entry = FeeEntry {
                id: Uuid::new_v4(),
                office_id: new.key.office_id,
                bank_id: new.key.bank_id,
                lawyer_id: new.key.lawyer_id,
                document_type_id: new.key.document_type_id,
                amount: new.amount,
                active: new.active,
                created_at: now,
                updated_at: now,
            };
            entries.push(entry.clone());
            Ok(entry)
        }

        async fn update(
            &self,
            office_id: Uuid,
            id: Uuid,
            changes: &FeeChanges,
        ) -> Result<FeeEntry, AppError> {
            let mut entries = self.entries.lock().unwrap();
            let index = entries
                .iter()
                .position(|e| e.id == id && e.office_id == office_id)
                .ok_or_else(|| AppError::NotFound(format!("Fee entry {id} not found")))?;

            let mut updated = entries[index].clone();
            if let Some(document_type_id) = changes.document_type_id {
                updated.document_type_id = document_type_id;
            }
            if let Some(amount) = changes.amount {
                updated.amount = amount;
            }
            if let Some(active) = changes.active {
                updated.active = active;
            }
            if Self::conflict(&entries, &updated.key(), Some(id)) {
                return Err(AppError::Conflict("duplicate fee entry".to_string()));
            }
            updated.updated_at = Utc::now();
            entries[index] = updated.clone();
            Ok(updated)
        }

        async fn delete(&self, office_id: Uuid, id: Uuid) -> Result<bool, AppError> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|e| !(e.id == id && e.office_id == office_id));
            Ok(entries.len() < before)
        }
    }
}
