//! Asset type configuration registry.
//!
//! One immutable [`AssetTypeConfig`] per numeric investment type id. The
//! built-in set is assembled once per process and shared.

pub mod bank_debt;
pub mod cash;
pub mod derivative;
pub mod equity;
pub mod factory;
pub mod fixed_income;
pub mod fund;
pub mod payable_receivable;
pub mod schema;

pub use schema::{
    AssetTypeConfig, FieldConfig, FieldKind, FlowStep, SectionConfig, Severity, TypeValidation,
    ValidationRule,
};

use crate::domain::{fields, FieldValue, InstrumentRecord};
use std::collections::BTreeMap;
use std::sync::OnceLock;

static BUILTIN: OnceLock<Registry> = OnceLock::new();

/// Lookup table from type id to configuration.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<u32, AssetTypeConfig>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The seven built-in asset types.
    pub fn builtin() -> &'static Registry {
        BUILTIN.get_or_init(|| {
            let mut registry = Registry::new();
            registry.register(fixed_income::config());
            registry.register(equity::config());
            registry.register(cash::config());
            registry.register(payable_receivable::config());
            registry.register(bank_debt::config());
            registry.register(fund::config());
            registry.register(derivative::config());
            registry
        })
    }

    /// Add or replace a type.
    pub fn register(&mut self, config: AssetTypeConfig) {
        self.types.insert(config.id, config);
    }

    pub fn get(&self, id: u32) -> Option<&AssetTypeConfig> {
        self.types.get(&id)
    }

    /// Resolve a raw type selector value. Empty, non-integral or unknown
    /// values yield `None`.
    pub fn get_config(&self, type_id: Option<&FieldValue>) -> Option<&AssetTypeConfig> {
        type_id.and_then(parse_type_id).and_then(|id| self.get(id))
    }

    /// Configuration for the type currently selected on `record`.
    pub fn resolve(&self, record: &InstrumentRecord) -> Option<&AssetTypeConfig> {
        self.get_config(record.get(fields::INVESTMENT_TYPE_CODE))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetTypeConfig> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Step and group references missing from each type's sections, keyed
    /// by type id. Empty when every configuration is consistent.
    pub fn consistency_errors(&self) -> BTreeMap<u32, Vec<String>> {
        self.types
            .values()
            .map(|c| (c.id, c.undeclared_references()))
            .filter(|(_, missing)| !missing.is_empty())
            .collect()
    }
}

/// Strict numeric parse: trimmed integer text or an integral number.
pub fn parse_type_id(value: &FieldValue) -> Option<u32> {
    match value {
        FieldValue::Text(s) => s.trim().parse::<u32>().ok(),
        FieldValue::Number(n) => n.to_integer().and_then(|i| u32::try_from(i).ok()),
        FieldValue::Bool(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_builtin_has_seven_types() {
        let registry = Registry::builtin();
        assert_eq!(registry.len(), 7);
        let labels: Vec<u32> = registry.iter().map(|c| c.id).collect();
        assert_eq!(labels, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_builtin_is_consistent() {
        let errors = Registry::builtin().consistency_errors();
        assert!(errors.is_empty(), "undeclared references: {:?}", errors);
    }

    #[test]
    fn test_parse_type_id_is_strict() {
        assert_eq!(parse_type_id(&FieldValue::text(" 7 ")), Some(7));
        assert_eq!(parse_type_id(&FieldValue::from(2)), Some(2));
        assert_eq!(parse_type_id(&FieldValue::text("7abc")), None);
        assert_eq!(parse_type_id(&FieldValue::text("")), None);
        assert_eq!(parse_type_id(&FieldValue::from(-1)), None);
        let fractional = FieldValue::Number(Decimal::from_str("1.5").unwrap());
        assert_eq!(parse_type_id(&fractional), None);
        assert_eq!(parse_type_id(&FieldValue::Bool(true)), None);
    }

    #[test]
    fn test_get_config_degrades_to_none() {
        let registry = Registry::builtin();
        assert!(registry.get_config(None).is_none());
        assert!(registry.get_config(Some(&FieldValue::text("99"))).is_none());
        assert_eq!(
            registry.get_config(Some(&FieldValue::text("1"))).map(|c| c.id),
            Some(1)
        );
    }

    #[test]
    fn test_resolve_from_record() {
        let record = InstrumentRecord::new().with(fields::INVESTMENT_TYPE_CODE, "7");
        let config = Registry::builtin().resolve(&record).unwrap();
        assert_eq!(config.label, "Derivados");
    }

    #[test]
    fn test_register_replaces_type() {
        let mut registry = Registry::new();
        registry.register(AssetTypeConfig::new(9, "Custom"));
        registry.register(AssetTypeConfig::new(9, "Custom v2"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(9).unwrap().label, "Custom v2");
    }

    #[test]
    fn test_consistency_reports_missing_fields() {
        let mut registry = Registry::new();
        registry.register(
            AssetTypeConfig::new(9, "Broken").step(FlowStep::new(1, &["ghost"], "Paso 1")),
        );
        let errors = registry.consistency_errors();
        assert_eq!(errors.get(&9), Some(&vec!["ghost".to_string()]));
    }

    #[test]
    fn test_fixed_fields_per_type() {
        let registry = Registry::builtin();
        let cash = registry.get(cash::ID).unwrap();
        assert!(cash.fixes_field(fields::COMPANY_NAME));
        assert_eq!(
            cash.default_value(fields::SECTOR_GICS),
            Some(&FieldValue::text("88888888"))
        );
        let fi = registry.get(fixed_income::ID).unwrap();
        assert!(!fi.fixes_field(fields::COMPANY_NAME));
    }

    #[test]
    fn test_restructuring_exclusions_cover_yield_family() {
        for config in Registry::builtin().iter() {
            for name in [
                fields::TIPO_CONTINUADOR,
                fields::DIA_VALIDEZ,
                fields::COMENTARIOS,
                fields::YIELD_SOURCE,
                fields::COUPON_TYPE_CODE,
                fields::CALLABLE,
            ] {
                assert!(
                    config.reestructuracion_exclusions.iter().any(|n| n == name),
                    "type {} does not exclude {}",
                    config.id,
                    name
                );
            }
        }
    }
}
