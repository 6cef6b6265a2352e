//! Wizard step calculation for brand-new instruments.

use crate::domain::{InstrumentRecord, Mode};
use crate::registry::{AssetTypeConfig, FlowStep};
use serde::Serialize;

/// Position of the wizard within a type's steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "step")]
pub enum StepPosition {
    /// The first step with missing fields.
    Step(u32),
    /// Every step is satisfied.
    Complete,
}

impl StepPosition {
    /// True when a section or group revealed at `step` is shown.
    pub fn reveals(&self, step: Option<u32>) -> bool {
        match (self, step) {
            (_, None) | (StepPosition::Complete, _) => true,
            (StepPosition::Step(current), Some(required)) => *current >= required,
        }
    }
}

/// Fields of `step` still empty in `state`, conditional ones included while
/// their condition holds.
pub fn missing_fields<'a>(step: &'a FlowStep, state: &InstrumentRecord) -> Vec<&'a str> {
    let conditional = step
        .conditional_fields
        .iter()
        .filter(|c| c.condition.evaluate(state))
        .flat_map(|c| c.fields.iter());
    step.required_fields
        .iter()
        .chain(conditional)
        .map(String::as_str)
        .filter(|name| !state.is_filled(name))
        .collect()
}

/// First step in order whose fields are not all filled.
pub fn calculate_step(config: &AssetTypeConfig, state: &InstrumentRecord) -> StepPosition {
    config
        .steps
        .iter()
        .find(|step| !missing_fields(step, state).is_empty())
        .map_or(StepPosition::Complete, |step| StepPosition::Step(step.id))
}

/// Current step, or `None` outside `new` mode or without a type.
pub fn current_step(
    mode: Mode,
    config: Option<&AssetTypeConfig>,
    state: &InstrumentRecord,
) -> Option<StepPosition> {
    match (mode, config) {
        (Mode::New, Some(config)) => Some(calculate_step(config, state)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fields::*;
    use crate::registry::{fixed_income, Registry};

    fn fi() -> &'static AssetTypeConfig {
        Registry::builtin().get(fixed_income::ID).unwrap()
    }

    #[test]
    fn test_empty_state_is_step_one() {
        assert_eq!(calculate_step(fi(), &InstrumentRecord::new()), StepPosition::Step(1));
    }

    #[test]
    fn test_conditional_fields_hold_the_step() {
        let state = InstrumentRecord::new()
            .with(INVESTMENT_TYPE_CODE, "1")
            .with(NAME_INSTRUMENTO, "BOND 2030")
            .with(PUBLIC_DATA_SOURCE, "BBG");
        assert_eq!(calculate_step(fi(), &state), StepPosition::Step(2));
        assert_eq!(missing_fields(&fi().steps[1], &state), vec![ISIN]);

        let with_isin = state.clone().with(ISIN, "US0378331005");
        assert_eq!(calculate_step(fi(), &with_isin), StepPosition::Step(3));

        let refinitiv = state.with(PUBLIC_DATA_SOURCE, "REFINITIV");
        assert_eq!(calculate_step(fi(), &refinitiv), StepPosition::Step(3));
    }

    #[test]
    fn test_later_steps_never_skip_an_earlier_gap() {
        let later_filled = InstrumentRecord::new()
            .with(INVESTMENT_TYPE_CODE, "1")
            .with(COMPANY_NAME, "Apple Inc")
            .with(ISSUER_TYPE_CODE, "3")
            .with(SECTOR_GICS, "45")
            .with(ISSUE_COUNTRY, "US")
            .with(RISK_COUNTRY, "US")
            .with(ISSUE_CURRENCY, "1")
            .with(RISK_CURRENCY, "1")
            .with(COUPON_TYPE_CODE, "ZERO")
            .with(YIELD_TYPE, "1")
            .with(YIELD_SOURCE, "INTERNAL")
            .with(PERPETUIDAD, "N")
            .with(RENDIMIENTO, "N");
        assert_eq!(calculate_step(fi(), &later_filled), StepPosition::Step(1));

        let named = later_filled.with(NAME_INSTRUMENTO, "BOND 2030");
        assert_eq!(calculate_step(fi(), &named), StepPosition::Step(2));

        let bbg_without_isin = named.with(PUBLIC_DATA_SOURCE, "BBG");
        assert_eq!(calculate_step(fi(), &bbg_without_isin), StepPosition::Step(2));

        let done = bbg_without_isin.with(ISIN, "US0378331005");
        assert_eq!(calculate_step(fi(), &done), StepPosition::Complete);
    }

    #[test]
    fn test_wrapper_only_runs_in_new_mode() {
        let state = InstrumentRecord::new();
        assert!(current_step(Mode::Exact, Some(fi()), &state).is_none());
        assert!(current_step(Mode::Restructuring, Some(fi()), &state).is_none());
        assert!(current_step(Mode::New, None, &state).is_none());
        assert_eq!(
            current_step(Mode::New, Some(fi()), &state),
            Some(StepPosition::Step(1))
        );
    }

    #[test]
    fn test_reveals() {
        assert!(StepPosition::Step(1).reveals(None));
        assert!(!StepPosition::Step(2).reveals(Some(3)));
        assert!(StepPosition::Step(3).reveals(Some(3)));
        assert!(StepPosition::Complete.reveals(Some(9)));
        assert!(StepPosition::Step(9) < StepPosition::Complete);
    }

    #[test]
    fn test_empty_flow_is_complete() {
        let config = AssetTypeConfig::new(9, "Empty");
        assert_eq!(calculate_step(&config, &InstrumentRecord::new()), StepPosition::Complete);
    }
}
