//! Sub-task metadata: a free-form JSON object written by several workflow steps.
//!
//! Each step writes only its own keys. Updates are shallow key-wise merges; an
//! update never replaces the whole object.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const EXECUTION_DATE: &str = "execution_date";
pub const EXECUTION_TIME: &str = "execution_time";
pub const DOCUMENT_TYPE_ID: &str = "document_type_id";
pub const PARTY_ID: &str = "party_id";
pub const DRAFT_TEXT: &str = "draft_text";
pub const AMOUNT: &str = "amount";
pub const GENERATED_DOCUMENT_ID: &str = "generated_document_id";
pub const RECEIPT_ID: &str = "receipt_id";

/// Typed read view over the metadata object.
///
/// Parsing is lenient: a key holding a value of the wrong shape reads as absent
/// instead of failing the whole view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubTaskMetadata {
    pub execution_date: Option<NaiveDate>,
    pub execution_time: Option<String>,
    pub document_type_id: Option<Uuid>,
    pub party_id: Option<Uuid>,
    pub draft_text: Option<String>,
    pub amount: Option<i64>,
    pub generated_document_id: Option<Uuid>,
    pub receipt_id: Option<Uuid>,
}

impl SubTaskMetadata {
    pub fn from_value(value: &Value) -> Self {
        match value.as_object() {
            Some(map) => Self::from_map(map),
            None => Self::default(),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        SubTaskMetadata {
            execution_date: str_field(map, EXECUTION_DATE)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
            execution_time: str_field(map, EXECUTION_TIME).map(normalize_time),
            document_type_id: uuid_field(map, DOCUMENT_TYPE_ID),
            party_id: uuid_field(map, PARTY_ID),
            draft_text: str_field(map, DRAFT_TEXT).map(str::to_string),
            amount: map.get(AMOUNT).and_then(Value::as_i64),
            generated_document_id: uuid_field(map, GENERATED_DOCUMENT_ID),
            receipt_id: uuid_field(map, RECEIPT_ID),
        }
    }
}

/// Typed partial update. `None` fields are left untouched; workflow-specific keys
/// go in `extra`; keys listed in `clear` are removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_document_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clear: Vec<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.to_map().is_empty() && self.clear.is_empty()
    }

    /// Flattens the typed fields and `extra` into the key/value pairs to upsert.
    /// Typed fields win over an `extra` entry with the same key.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        };
        put(
            EXECUTION_DATE,
            self.execution_date
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        );
        put(EXECUTION_TIME, self.execution_time.clone().map(Value::String));
        put(DOCUMENT_TYPE_ID, self.document_type_id.map(uuid_value));
        put(PARTY_ID, self.party_id.map(uuid_value));
        put(DRAFT_TEXT, self.draft_text.clone().map(Value::String));
        put(AMOUNT, self.amount.map(Value::from));
        put(GENERATED_DOCUMENT_ID, self.generated_document_id.map(uuid_value));
        put(RECEIPT_ID, self.receipt_id.map(uuid_value));
        map
    }
}

/// Shallow key-wise merge of `patch` into `base`.
///
/// Keys absent from the patch keep their value. A `null` value, or a key listed in
/// `clear`, removes the key. Applying the same patch twice yields the same object.
pub fn merge_metadata(base: &Value, patch: &MetadataPatch) -> Value {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    for key in &patch.clear {
        merged.remove(key);
    }
    for (key, value) in patch.to_map() {
        if value.is_null() {
            merged.remove(&key);
        } else {
            merged.insert(key, value);
        }
    }
    Value::Object(merged)
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn uuid_field(map: &Map<String, Value>, key: &str) -> Option<Uuid> {
    str_field(map, key).and_then(|s| Uuid::parse_str(s).ok())
}

fn uuid_value(id: Uuid) -> Value {
    Value::String(id.to_string())
}

/// Renders `9:5`, `09:05` or `09:05:00` as `09:05`; anything else is kept verbatim.
fn normalize_time(raw: &str) -> String {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_keys_not_in_patch() {
        let base = json!({"execution_date": "2024-03-05", "draft_text": "borrador"});
        let patch = MetadataPatch {
            amount: Some(12000),
            ..Default::default()
        };
        let merged = merge_metadata(&base, &patch);
        assert_eq!(
            merged,
            json!({"execution_date": "2024-03-05", "draft_text": "borrador", "amount": 12000})
        );
    }

    #[test]
    fn test_merge_overwrites_only_patched_keys() {
        let base = json!({"draft_text": "old", "amount": 5});
        let patch = MetadataPatch {
            draft_text: Some("new".to_string()),
            ..Default::default()
        };
        let merged = merge_metadata(&base, &patch);
        assert_eq!(merged, json!({"draft_text": "new", "amount": 5}));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = json!({"custom": true});
        let mut extra = Map::new();
        extra.insert("step".to_string(), json!("notified"));
        let patch = MetadataPatch {
            execution_time: Some("10:30".to_string()),
            extra,
            ..Default::default()
        };
        let once = merge_metadata(&base, &patch);
        let twice = merge_metadata(&once, &patch);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_null_extra_and_clear_remove_keys() {
        let base = json!({"a": 1, "b": 2, "c": 3});
        let mut extra = Map::new();
        extra.insert("a".to_string(), Value::Null);
        let patch = MetadataPatch {
            extra,
            clear: vec!["b".to_string()],
            ..Default::default()
        };
        assert_eq!(merge_metadata(&base, &patch), json!({"c": 3}));
    }

    #[test]
    fn test_merge_into_non_object_starts_fresh() {
        let patch = MetadataPatch {
            amount: Some(1),
            ..Default::default()
        };
        assert_eq!(merge_metadata(&Value::Null, &patch), json!({"amount": 1}));
    }

    #[test]
    fn test_typed_view_is_lenient() {
        let party = Uuid::new_v4();
        let value = json!({
            "execution_date": "not a date",
            "execution_time": "9:05",
            "party_id": party.to_string(),
            "document_type_id": 42,
            "amount": "12000",
        });
        let meta = SubTaskMetadata::from_value(&value);
        assert_eq!(meta.execution_date, None);
        assert_eq!(meta.execution_time.as_deref(), Some("09:05"));
        assert_eq!(meta.party_id, Some(party));
        assert_eq!(meta.document_type_id, None);
        assert_eq!(meta.amount, None);
    }

    #[test]
    fn test_patch_round_trips_through_typed_view() {
        let patch = MetadataPatch {
            execution_date: NaiveDate::from_ymd_opt(2024, 3, 5),
            amount: Some(12000),
            ..Default::default()
        };
        let meta = SubTaskMetadata::from_value(&merge_metadata(&json!({}), &patch));
        assert_eq!(meta.execution_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(meta.amount, Some(12000));
        assert!(!patch.is_empty());
        assert!(MetadataPatch::default().is_empty());
    }
}
