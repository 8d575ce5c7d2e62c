//! Two-tier fee lookup.
//!
//! An entry is either bank-wide (`lawyer_id = None`) or lawyer-specific. One rule
//! is used for single lookups and for listings:
//!
//! - `Strict`: only the exact lawyer scope counts (no lawyer means bank-wide).
//! - `WithBankFallback`: the lawyer-specific entry if there is one, else the
//!   bank-wide entry. A result never holds both tiers for one document type.
//!
//! Inactive entries never resolve.

use std::collections::BTreeMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::fees::repository::FeeRepository;
use crate::models::fee::{FeeEntry, FeeKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeLookup {
    #[default]
    Strict,
    WithBankFallback,
}

impl FeeLookup {
    pub fn from_fallback_flag(fallback: bool) -> Self {
        if fallback {
            FeeLookup::WithBankFallback
        } else {
            FeeLookup::Strict
        }
    }
}

/// Picks the entry that answers a lookup among candidates sharing office, bank
/// and document type.
pub fn select_entry<'a>(
    candidates: &'a [FeeEntry],
    lawyer_id: Option<Uuid>,
    lookup: FeeLookup,
) -> Option<&'a FeeEntry> {
    let active_in_scope =
        |scope: Option<Uuid>| candidates.iter().find(|e| e.active && e.lawyer_id == scope);

    match (lawyer_id, lookup) {
        (Some(id), FeeLookup::Strict) => active_in_scope(Some(id)),
        (Some(id), FeeLookup::WithBankFallback) => {
            active_in_scope(Some(id)).or_else(|| active_in_scope(None))
        }
        (None, _) => active_in_scope(None),
    }
}

/// Resolves the fee for one (office, bank, document type, lawyer?) request.
pub async fn resolve_fee(
    repo: &dyn FeeRepository,
    office_id: Uuid,
    bank_id: Uuid,
    document_type_id: Uuid,
    lawyer_id: Option<Uuid>,
    lookup: FeeLookup,
) -> Result<Option<FeeEntry>, AppError> {
    let key = FeeKey {
        office_id,
        bank_id,
        lawyer_id,
        document_type_id,
    };

    let mut candidates = Vec::with_capacity(2);
    if let Some(entry) = repo.find(&key).await? {
        candidates.push(entry);
    }
    if lawyer_id.is_some() && lookup == FeeLookup::WithBankFallback {
        if let Some(entry) = repo.find(&key.bank_wide()).await? {
            candidates.push(entry);
        }
    }

    Ok(select_entry(&candidates, lawyer_id, lookup).cloned())
}

/// The effective schedule for one bank: at most one entry per document type,
/// chosen with [`select_entry`].
pub fn effective_entries(
    entries: Vec<FeeEntry>,
    lawyer_id: Option<Uuid>,
    lookup: FeeLookup,
) -> Vec<FeeEntry> {
    let mut by_document_type: BTreeMap<Uuid, Vec<FeeEntry>> = BTreeMap::new();
    for entry in entries {
        by_document_type
            .entry(entry.document_type_id)
            .or_default()
            .push(entry);
    }
    by_document_type
        .values()
        .filter_map(|group| select_entry(group, lawyer_id, lookup).cloned())
        .collect()
}
