use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A priced association of bank, optional lawyer and document type.
/// `lawyer_id = None` is the bank-wide default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FeeEntry {
    pub id: Uuid,
    pub office_id: Uuid,
    pub bank_id: Uuid,
    pub lawyer_id: Option<Uuid>,
    pub document_type_id: Uuid,
    pub amount: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeeEntry {
    pub fn key(&self) -> FeeKey {
        FeeKey {
            office_id: self.office_id,
            bank_id: self.bank_id,
            lawyer_id: self.lawyer_id,
            document_type_id: self.document_type_id,
        }
    }
}

/// The uniqueness tuple of a fee entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeeKey {
    pub office_id: Uuid,
    pub bank_id: Uuid,
    pub lawyer_id: Option<Uuid>,
    pub document_type_id: Uuid,
}

impl FeeKey {
    /// The bank-wide key for the same office, bank and document type.
    pub fn bank_wide(&self) -> FeeKey {
        FeeKey {
            lawyer_id: None,
            ..*self
        }
    }
}
