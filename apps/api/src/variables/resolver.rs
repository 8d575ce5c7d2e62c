//! Builds the substitution map for a loaded case.
//!
//! Every key in [`ALL_KEYS`] is always present. Missing data resolves to `""`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cases::aggregate::CaseAggregate;
use crate::cases::metadata::SubTaskMetadata;
use crate::models::reference::PartyRow;
use crate::variables::spanish::{date_in_words, format_amount};

pub const DEMANDADO_NOMBRE: &str = "demandado_nombre";
pub const DEMANDADO_RUT: &str = "demandado_rut";
pub const DEMANDADO_DOMICILIO: &str = "demandado_domicilio";
pub const DEMANDADO_COMUNA: &str = "demandado_comuna";
pub const ABOGADO_NOMBRE: &str = "abogado_nombre";
pub const ABOGADO_DOMICILIO: &str = "abogado_domicilio";
pub const ROL: &str = "rol";
pub const TRIBUNAL: &str = "tribunal";
pub const CARATULA: &str = "caratula";
pub const BANCO: &str = "banco";
pub const CUANTIA: &str = "cuantia";
pub const MONTO: &str = "monto";
pub const FECHA_DILIGENCIA: &str = "fecha_diligencia";
pub const HORA_DILIGENCIA: &str = "hora_diligencia";
pub const OFICINA: &str = "oficina";
pub const OPERACION: &str = "operacion";

pub const ALL_KEYS: [&str; 16] = [
    DEMANDADO_NOMBRE,
    DEMANDADO_RUT,
    DEMANDADO_DOMICILIO,
    DEMANDADO_COMUNA,
    ABOGADO_NOMBRE,
    ABOGADO_DOMICILIO,
    ROL,
    TRIBUNAL,
    CARATULA,
    BANCO,
    CUANTIA,
    MONTO,
    FECHA_DILIGENCIA,
    HORA_DILIGENCIA,
    OFICINA,
    OPERACION,
];

/// String-keyed substitution map. Lookups of unknown keys yield `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Variables(BTreeMap<String, String>);

impl Variables {
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[cfg(test)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Variables(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Resolves the fixed variable set for a case aggregate. Never fails.
pub fn resolve_variables(agg: &CaseAggregate) -> Variables {
    let meta = agg
        .sub_task
        .as_ref()
        .map(|t| SubTaskMetadata::from_value(&t.metadata))
        .unwrap_or_default();

    let party = select_party(&agg.parties, &meta);

    let mut vars: Variables = ALL_KEYS.iter().map(|k| (*k, "")).collect();

    if let Some(p) = party {
        vars.insert(DEMANDADO_NOMBRE, p.name.clone());
        vars.insert(DEMANDADO_RUT, p.rut.clone().unwrap_or_default());
        vars.insert(DEMANDADO_DOMICILIO, p.address.clone().unwrap_or_default());
        vars.insert(DEMANDADO_COMUNA, p.commune.clone().unwrap_or_default());
    }
    if let Some(l) = &agg.lawyer {
        vars.insert(ABOGADO_NOMBRE, l.name.clone());
        vars.insert(ABOGADO_DOMICILIO, l.address.clone().unwrap_or_default());
    }
    if let Some(c) = &agg.court {
        vars.insert(TRIBUNAL, c.name.clone());
    }
    if let Some(b) = &agg.bank {
        vars.insert(BANCO, b.name.clone());
    }

    vars.insert(ROL, agg.case.docket_number.clone());
    vars.insert(CARATULA, agg.case.caption.clone().unwrap_or_default());
    vars.insert(
        CUANTIA,
        agg.case.claim_amount.map(format_amount).unwrap_or_default(),
    );
    vars.insert(OPERACION, agg.case.operation_number.clone().unwrap_or_default());
    vars.insert(OFICINA, agg.office.name.clone());

    vars.insert(MONTO, meta.amount.map(format_amount).unwrap_or_default());
    vars.insert(
        FECHA_DILIGENCIA,
        meta.execution_date.map(date_in_words).unwrap_or_default(),
    );
    vars.insert(HORA_DILIGENCIA, meta.execution_time.unwrap_or_default());

    vars
}

/// The party named by the sub-task if it belongs to the case, else the first one.
fn select_party<'a>(parties: &'a [PartyRow], meta: &SubTaskMetadata) -> Option<&'a PartyRow> {
    meta.party_id
        .and_then(|id| parties.iter().find(|p| p.id == id))
        .or_else(|| parties.first())
}
