use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CaseRow {
    pub id: Uuid,
    pub office_id: Uuid,
    pub docket_number: String,
    pub caption: Option<String>,
    pub court_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub bank_id: Option<Uuid>,
    pub claim_amount: Option<i64>,
    pub operation_number: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubTaskRow {
    pub id: Uuid,
    pub case_id: Uuid,
    pub task_type: String,
    pub status: String,
    pub metadata: Value,
    pub scheduled_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate status of a case. Derived from its sub-tasks, never written directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    InProgress,
    Done,
    Archived,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::InProgress => "in_progress",
            CaseStatus::Done => "done",
            CaseStatus::Archived => "archived",
        }
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CaseStatus::Pending),
            "in_progress" => Ok(CaseStatus::InProgress),
            "done" => Ok(CaseStatus::Done),
            "archived" => Ok(CaseStatus::Archived),
            other => Err(format!("unknown case status '{other}'")),
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    Pending,
    Completed,
    Failed,
}

impl SubTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubTaskStatus::Pending => "pending",
            SubTaskStatus::Completed => "completed",
            SubTaskStatus::Failed => "failed",
        }
    }
}

impl FromStr for SubTaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubTaskStatus::Pending),
            "completed" => Ok(SubTaskStatus::Completed),
            "failed" => Ok(SubTaskStatus::Failed),
            other => Err(format!("unknown sub-task status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_status_string_forms_match_schema() {
        for status in [
            CaseStatus::Pending,
            CaseStatus::InProgress,
            CaseStatus::Done,
            CaseStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<CaseStatus>(), Ok(status));
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, Value::String(status.as_str().to_string()));
        }
    }

    #[test]
    fn test_unknown_sub_task_status_is_rejected() {
        assert!("cancelled".parse::<SubTaskStatus>().is_err());
        assert_eq!("failed".parse::<SubTaskStatus>(), Ok(SubTaskStatus::Failed));
    }
}
