//! Dependent-field invalidation.
//!
//! Changing an upstream field resets everything derived from it. Rules are
//! keyed by field name and shared by all asset types; a type can add its own
//! field-level cascades on top.

use super::condition::ValueGate;
use crate::domain::fields::*;
use crate::domain::{Company, CompanyState, FieldUpdates, FieldValue, InstrumentRecord};
use crate::registry::AssetTypeConfig;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Fields reset when `field` changes, and when the reset applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeRule {
    pub clear_fields: Vec<&'static str>,
    /// Test on the incoming value; the rule applies only when it holds.
    pub gate: Option<ValueGate>,
    pub skip_if_auto_populate: bool,
    pub skip_if_company_selected: bool,
    pub clear_company_state: bool,
}

impl CascadeRule {
    fn clearing(groups: &[&[&'static str]]) -> Self {
        let mut clear_fields: Vec<&'static str> = Vec::new();
        for &name in groups.iter().flat_map(|g| g.iter()) {
            if !clear_fields.contains(&name) {
                clear_fields.push(name);
            }
        }
        Self {
            clear_fields,
            gate: None,
            skip_if_auto_populate: false,
            skip_if_company_selected: false,
            clear_company_state: false,
        }
    }

    fn gated(mut self, gate: ValueGate) -> Self {
        self.gate = Some(gate);
        self
    }

    fn skip_if_auto_populate(mut self) -> Self {
        self.skip_if_auto_populate = true;
        self
    }

    fn skip_if_company_selected(mut self) -> Self {
        self.skip_if_company_selected = true;
        self
    }

    fn clear_company_state(mut self) -> Self {
        self.clear_company_state = true;
        self
    }

    fn applies(&self, new_value: &FieldValue, company_state: CompanyState, ctx: BatchContext) -> bool {
        if self.gate.as_ref().is_some_and(|g| !g.allows(new_value)) {
            return false;
        }
        if self.skip_if_auto_populate && ctx.auto_populating {
            return false;
        }
        if self.skip_if_company_selected && company_state == CompanyState::Selected {
            return false;
        }
        true
    }
}

static RULES: OnceLock<BTreeMap<&'static str, CascadeRule>> = OnceLock::new();

/// The static, field-keyed rule table.
pub fn rules() -> &'static BTreeMap<&'static str, CascadeRule> {
    RULES.get_or_init(|| {
        let mut rules = BTreeMap::new();
        rules.insert(
            INVESTMENT_TYPE_CODE,
            CascadeRule::clearing(&[
                COMPANY_FIELDS,
                IDENTIFIER_FIELDS,
                GEOGRAPHY_FIELDS,
                FI_PARAMETER_FIELDS,
                BBG_FIELDS,
                TYPE_PARAMETER_FIELDS,
                &[SUB_ID],
            ])
            .clear_company_state(),
        );
        rules.insert(
            NAME_INSTRUMENTO,
            CascadeRule::clearing(&[
                COMPANY_FIELDS,
                IDENTIFIER_FIELDS,
                GEOGRAPHY_FIELDS,
                FI_PARAMETER_FIELDS,
                BBG_FIELDS,
            ])
            .clear_company_state(),
        );
        rules.insert(
            PUBLIC_DATA_SOURCE,
            CascadeRule::clearing(&[
                SECURITY_IDENTIFIERS,
                GEOGRAPHY_FIELDS,
                &[PERPETUIDAD, RENDIMIENTO, COUPON_FREQUENCY],
                BBG_FIELDS,
            ]),
        );
        rules.insert(
            COMPANY_NAME,
            CascadeRule::clearing(&[
                &[ISSUER_TYPE_CODE, SECTOR_GICS],
                GEOGRAPHY_FIELDS,
                FI_PARAMETER_FIELDS,
                BBG_FIELDS,
            ])
            .skip_if_auto_populate(),
        );
        for field in [ISSUER_TYPE_CODE, SECTOR_GICS] {
            rules.insert(
                field,
                CascadeRule::clearing(&[GEOGRAPHY_FIELDS, FI_PARAMETER_FIELDS, BBG_FIELDS])
                    .skip_if_company_selected(),
            );
        }
        rules.insert(
            RISK_COUNTRY,
            CascadeRule::clearing(&[&[SECTOR_CHILE_TYPE_CODE]])
                .gated(ValueGate::NotEquals("CL".to_string())),
        );
        rules.insert(
            YIELD_SOURCE,
            CascadeRule::clearing(&[BBG_FIELDS]).gated(ValueGate::NotEquals("BBG".to_string())),
        );
        rules.insert(
            COUPON_TYPE_CODE,
            CascadeRule::clearing(&[&[COUPON_FREQUENCY]])
                .gated(ValueGate::Equals("ZERO".to_string())),
        );
        rules
    })
}

/// Whether the current batch of writes comes from auto-population rather
/// than direct user input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchContext {
    pub auto_populating: bool,
}

impl BatchContext {
    pub fn user() -> Self {
        Self {
            auto_populating: false,
        }
    }

    pub fn auto_populate() -> Self {
        Self {
            auto_populating: true,
        }
    }
}

/// Writes produced by one field change, to be merged atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub updates: FieldUpdates,
    pub clear_company_state: bool,
}

/// Reset value for a cleared field under `config`: its default, else empty.
fn reset_value(name: &str, config: Option<&AssetTypeConfig>) -> FieldValue {
    config
        .and_then(|c| c.default_value(name))
        .cloned()
        .unwrap_or_else(FieldValue::empty)
}

/// Compute every write caused by setting `field` to `new_value`.
///
/// `config` is the type the reset values come from. For the type selector
/// that is the incoming type.
pub fn compute_cascade(
    field: &str,
    new_value: &FieldValue,
    config: Option<&AssetTypeConfig>,
    company_state: CompanyState,
    ctx: BatchContext,
) -> CascadeOutcome {
    let mut clear: Vec<&str> = Vec::new();
    let mut clear_company_state = false;

    if let Some(rule) = rules().get(field) {
        if rule.applies(new_value, company_state, ctx) {
            clear.extend(rule.clear_fields.iter().copied());
            clear_company_state = rule.clear_company_state;
        }
    }

    if let Some((_, field_config)) = config.and_then(|c| c.find_field(field)) {
        let gate_holds = field_config
            .cascade_condition
            .as_ref()
            .map_or(true, |g| g.allows(new_value));
        if gate_holds {
            clear.extend(field_config.cascade.iter().map(String::as_str));
        }
    }

    let mut updates = FieldUpdates::new();
    for name in clear {
        if name != field {
            updates.insert(name.to_string(), reset_value(name, config));
        }
    }
    updates.insert(field.to_string(), new_value.clone());

    if updates.len() > 1 {
        debug!(
            field,
            cleared = updates.len() - 1,
            clear_company_state,
            "Cascade computed"
        );
    }

    CascadeOutcome {
        updates,
        clear_company_state,
    }
}

/// Fill a freshly chosen type's defaults and auto-populated fields where
/// `state` is still empty.
pub fn type_defaults(config: &AssetTypeConfig, state: &InstrumentRecord) -> FieldUpdates {
    let mut updates = FieldUpdates::new();
    for field in config.sections.iter().flat_map(|s| s.fields.iter()) {
        if let Some(default) = &field.default_value {
            if !state.is_filled(&field.name) {
                updates.insert(field.name.clone(), default.clone());
            }
        }
    }
    for rule in &config.auto_populate {
        if state.is_filled(&rule.target) {
            continue;
        }
        if let Some(value) = state.get(&rule.source).filter(|v| !v.is_empty()) {
            updates.insert(rule.target.clone(), value.clone());
        }
    }
    updates
}

/// Cascade for the type selector merged with the incoming type's defaults.
///
/// Defaults are computed against the draft as it will look after the
/// cascade, so the whole change lands as one batch.
pub fn type_change(
    new_value: &FieldValue,
    incoming: Option<&AssetTypeConfig>,
    state: &InstrumentRecord,
    company_state: CompanyState,
) -> CascadeOutcome {
    let mut outcome = compute_cascade(
        INVESTMENT_TYPE_CODE,
        new_value,
        incoming,
        company_state,
        BatchContext::user(),
    );
    if let Some(config) = incoming {
        let mut projected = state.clone();
        projected.merge(&outcome.updates);
        outcome.updates.extend(type_defaults(config, &projected));
    }
    outcome
}

/// Writes copying a matched company onto the draft.
///
/// Runs as an auto-populating batch under `selected` state, so neither the
/// company name rule nor the issuer/sector rules clear anything. Fields the
/// type pins to constants are left alone.
pub fn populate_from_company(company: &Company, config: Option<&AssetTypeConfig>) -> FieldUpdates {
    let values = [
        (COMPANY_NAME, Some(company.company_name.as_str())),
        (ISSUER_TYPE_CODE, company.issuer_type_code.as_deref()),
        (SECTOR_GICS, company.sector_gics.as_deref()),
    ];
    let mut updates = FieldUpdates::new();
    for (name, value) in values {
        if config.is_some_and(|c| c.fixes_field(name)) {
            continue;
        }
        let value = FieldValue::text(value.unwrap_or_default());
        let outcome = compute_cascade(
            name,
            &value,
            config,
            CompanyState::Selected,
            BatchContext::auto_populate(),
        );
        updates.extend(outcome.updates);
    }
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{cash, derivative, equity, fixed_income, Registry};

    fn fi() -> &'static AssetTypeConfig {
        Registry::builtin().get(fixed_income::ID).unwrap()
    }

    #[test]
    fn test_unruled_field_is_single_update() {
        let outcome = compute_cascade(
            SEDOL,
            &FieldValue::text("B0YBKJ7"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert_eq!(outcome.updates.len(), 1);
        assert_eq!(outcome.updates[SEDOL], FieldValue::text("B0YBKJ7"));
        assert!(!outcome.clear_company_state);
    }

    #[test]
    fn test_risk_country_gate() {
        let to_us = compute_cascade(
            RISK_COUNTRY,
            &FieldValue::text("US"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert_eq!(to_us.updates[SECTOR_CHILE_TYPE_CODE], FieldValue::empty());

        let to_cl = compute_cascade(
            RISK_COUNTRY,
            &FieldValue::text("CL"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert!(!to_cl.updates.contains_key(SECTOR_CHILE_TYPE_CODE));
    }

    #[test]
    fn test_yield_source_literal_bbg() {
        let other = compute_cascade(
            YIELD_SOURCE,
            &FieldValue::text("INTERNAL"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        for name in BBG_FIELDS {
            assert_eq!(other.updates[*name], FieldValue::empty());
        }
        let bbg = compute_cascade(
            YIELD_SOURCE,
            &FieldValue::text("BBG"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert_eq!(bbg.updates.len(), 1);
    }

    #[test]
    fn test_coupon_type_zero_clears_frequency() {
        let zero = compute_cascade(
            COUPON_TYPE_CODE,
            &FieldValue::text("ZERO"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert!(zero.updates.contains_key(COUPON_FREQUENCY));
        let fixed = compute_cascade(
            COUPON_TYPE_CODE,
            &FieldValue::text("FIXED"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert!(!fixed.updates.contains_key(COUPON_FREQUENCY));
    }

    #[test]
    fn test_company_name_skipped_when_auto_populating() {
        let user = compute_cascade(
            COMPANY_NAME,
            &FieldValue::text("ACME"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert!(user.updates.contains_key(ISSUER_TYPE_CODE));
        assert!(user.updates.contains_key(COUPON_TYPE_CODE));

        let auto = compute_cascade(
            COMPANY_NAME,
            &FieldValue::text("ACME"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::auto_populate(),
        );
        assert_eq!(auto.updates.len(), 1);
    }

    #[test]
    fn test_issuer_skipped_when_company_selected() {
        let selected = compute_cascade(
            ISSUER_TYPE_CODE,
            &FieldValue::text("3"),
            Some(fi()),
            CompanyState::Selected,
            BatchContext::user(),
        );
        assert_eq!(selected.updates.len(), 1);
        let writing = compute_cascade(
            SECTOR_GICS,
            &FieldValue::text("45"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert!(writing.updates.contains_key(RISK_COUNTRY));
    }

    #[test]
    fn test_name_change_clears_company_state() {
        let outcome = compute_cascade(
            NAME_INSTRUMENTO,
            &FieldValue::text("BOND 2030"),
            Some(fi()),
            CompanyState::Selected,
            BatchContext::user(),
        );
        assert!(outcome.clear_company_state);
        assert!(outcome.updates.contains_key(COMPANY_NAME));
        assert!(!outcome.updates.contains_key(INVESTMENT_TYPE_CODE));
    }

    #[test]
    fn test_reset_uses_type_defaults() {
        let cash = Registry::builtin().get(cash::ID).unwrap();
        let outcome = compute_cascade(
            NAME_INSTRUMENTO,
            &FieldValue::text("USD CASH"),
            Some(cash),
            CompanyState::Writing,
            BatchContext::user(),
        );
        assert_eq!(outcome.updates[COMPANY_NAME], FieldValue::text("[CASH & EQUIV.]"));
        assert_eq!(outcome.updates[ISSUE_COUNTRY], FieldValue::text("[Cash & Eq]"));
        assert_eq!(outcome.updates[ISIN], FieldValue::empty());
    }

    #[test]
    fn test_type_change_seeds_incoming_defaults() {
        let deriv = Registry::builtin().get(derivative::ID).unwrap();
        let state = InstrumentRecord::new()
            .with(MONEDA, "USD")
            .with(NAME_INSTRUMENTO, "FWD USD/CLP")
            .with(ISIN, "US0378331005");
        let outcome = type_change(&FieldValue::text("7"), Some(deriv), &state, CompanyState::Writing);
        assert!(outcome.clear_company_state);
        assert_eq!(outcome.updates[COMPANY_NAME], FieldValue::text("[DERIV]"));
        assert_eq!(outcome.updates[SECTOR_GICS], FieldValue::text("77777777"));
        assert_eq!(outcome.updates[RISK_COUNTRY], FieldValue::text("[Deriv]"));
        assert_eq!(outcome.updates[ISSUE_CURRENCY], FieldValue::text("USD"));
        assert_eq!(outcome.updates[RISK_CURRENCY], FieldValue::text("USD"));
        assert_eq!(outcome.updates[ISIN], FieldValue::empty());
        assert!(!outcome.updates.contains_key(NAME_INSTRUMENTO));
    }

    #[test]
    fn test_field_level_cascade_joins_static_rule() {
        let equity = Registry::builtin().get(equity::ID).unwrap();
        let outcome = compute_cascade(
            PUBLIC_DATA_SOURCE,
            &FieldValue::text("BBG"),
            Some(equity),
            CompanyState::Writing,
            BatchContext::user(),
        );
        for name in [ISIN, TICKER_BBG, SEDOL, CUSIP, RISK_COUNTRY, COCO] {
            assert!(outcome.updates.contains_key(name), "missing {}", name);
        }
    }

    #[test]
    fn test_cascade_is_idempotent() {
        let state = InstrumentRecord::new()
            .with(INVESTMENT_TYPE_CODE, "1")
            .with(COMPANY_NAME, "ACME")
            .with(COUPON_TYPE_CODE, "FIXED");
        let outcome = compute_cascade(
            NAME_INSTRUMENTO,
            &FieldValue::text("BOND"),
            Some(fi()),
            CompanyState::Writing,
            BatchContext::user(),
        );
        let mut once = state.clone();
        once.merge(&outcome.updates);
        let mut twice = once.clone();
        twice.merge(&outcome.updates);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_populate_from_company_respects_fixed_fields() {
        let company = Company::new("Banco de Chile")
            .with_issuer_type("3")
            .with_sector("40");
        let updates = populate_from_company(&company, Some(fi()));
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[SECTOR_GICS], FieldValue::text("40"));

        let cash = Registry::builtin().get(cash::ID).unwrap();
        assert!(populate_from_company(&company, Some(cash)).is_empty());
    }
}
