//! Field inheritance from an existing instrument record.

use crate::domain::fields::*;
use crate::domain::{FieldUpdates, FieldValue, InstrumentRecord};
use crate::registry::AssetTypeConfig;

/// Every inheritable field present on `source`.
pub fn inherit_all(source: &InstrumentRecord) -> FieldUpdates {
    INHERITABLE_FIELDS
        .iter()
        .filter_map(|&name| source.get(name).map(|v| (name.to_string(), v.clone())))
        .collect()
}

/// Inheritance for a partial match: currencies are left empty for the user.
pub fn inherit_without_currencies(source: &InstrumentRecord) -> FieldUpdates {
    let mut updates = inherit_all(source);
    for name in CURRENCY_FIELDS {
        updates.insert(name.to_string(), FieldValue::empty());
    }
    updates
}

/// Inheritance from a restructured predecessor. The type's exclusions are
/// written as empty so nothing stale survives from the draft either.
pub fn inherit_for_restructuring(
    predecessor: &InstrumentRecord,
    config: Option<&AssetTypeConfig>,
) -> FieldUpdates {
    let mut updates = inherit_all(predecessor);
    let exclusions: Vec<&str> = config
        .map(|c| c.reestructuracion_exclusions.iter().map(String::as_str).collect())
        .unwrap_or_else(|| RESTRUCTURING_BASE_EXCLUSIONS.to_vec());
    for name in exclusions {
        updates.insert(name.to_string(), FieldValue::empty());
    }
    updates
}
