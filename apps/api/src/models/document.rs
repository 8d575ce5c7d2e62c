use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentTypeRow {
    pub id: Uuid,
    pub office_id: Uuid,
    pub name: String,
    pub category: String,
    pub template_body: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedDocumentRow {
    pub id: Uuid,
    pub office_id: Uuid,
    pub case_id: Uuid,
    pub sub_task_id: Option<Uuid>,
    pub document_type_id: Option<Uuid>,
    pub name: String,
    pub category: String,
    /// Object key of the PDF payload in the document bucket.
    pub payload_key: String,
    pub page_count: i32,
    pub version: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReceiptRow {
    pub id: Uuid,
    pub office_id: Uuid,
    pub case_id: Uuid,
    pub sub_task_id: Option<Uuid>,
    pub document_id: Uuid,
    pub amount: i64,
    pub payment_method: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Check,
    Deposit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::Deposit => "deposit",
        }
    }

    /// Label printed on the receipt.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Efectivo",
            PaymentMethod::Transfer => "Transferencia electrónica",
            PaymentMethod::Check => "Cheque",
            PaymentMethod::Deposit => "Depósito bancario",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" => Ok(PaymentMethod::Transfer),
            "check" => Ok(PaymentMethod::Check),
            "deposit" => Ok(PaymentMethod::Deposit),
            other => Err(format!("unknown payment method '{other}'")),
        }
    }
}
