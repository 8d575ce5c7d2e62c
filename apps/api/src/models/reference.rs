use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfficeRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourtRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BankRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LawyerRow {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
}

/// Opposing party with its commune name already joined in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PartyRow {
    pub id: Uuid,
    pub case_id: Uuid,
    pub name: String,
    pub rut: Option<String>,
    pub address: Option<String>,
    pub commune: Option<String>,
}
