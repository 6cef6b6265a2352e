//! Visibility, requiredness and read-only resolution for the form.

use super::condition;
use super::step::{current_step, StepPosition};
use crate::domain::fields::*;
use crate::domain::{CompanyState, InstrumentRecord, Mode};
use crate::registry::schema::{AlertSeverity, SectionAlert, SectionConfig, SectionGroup};
use crate::registry::{AssetTypeConfig, FieldKind};
use serde::Serialize;

/// Fields editable on a partial match: the new currency and the way out
/// into restructuring.
const PARTIAL_EDITABLE: &[&str] = &[ISSUE_CURRENCY, RISK_CURRENCY, ES_REESTRUCTURACION];

/// Fields editable while no mode is active: the lookup inputs.
const IDLE_EDITABLE: &[&str] = &[
    ID_INSTRUMENTO,
    ES_REESTRUCTURACION,
    ES_INSTRUMENTO_NUEVO,
    INVESTMENT_TYPE_CODE,
];

/// Answers visibility questions for one snapshot of a session.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    config: Option<&'a AssetTypeConfig>,
    state: &'a InstrumentRecord,
    mode: Mode,
    company_state: CompanyState,
    step: Option<StepPosition>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        config: Option<&'a AssetTypeConfig>,
        state: &'a InstrumentRecord,
        mode: Mode,
        company_state: CompanyState,
    ) -> Self {
        Self {
            config,
            state,
            mode,
            company_state,
            step: current_step(mode, config, state),
        }
    }

    pub fn step(&self) -> Option<StepPosition> {
        self.step
    }

    pub fn is_field_visible(&self, name: &str) -> bool {
        let Some(config) = self.config else {
            return false;
        };
        if config.is_excluded(name) {
            return false;
        }
        if config.sections.iter().any(|s| s.hides(name)) {
            return false;
        }
        match config.find_field(name) {
            Some((_, field)) if field.hidden => false,
            Some((_, field)) => condition::evaluate(field.visible_when.as_ref(), self.state),
            None => true,
        }
    }

    pub fn is_field_required(&self, name: &str) -> bool {
        if !self.is_field_visible(name) {
            return false;
        }
        match self.mode {
            Mode::Exact => false,
            Mode::Partial => CURRENCY_FIELDS.contains(&name),
            Mode::Idle | Mode::New | Mode::Restructuring => {
                let Some((_, field)) = self.config.and_then(|c| c.find_field(name)) else {
                    return false;
                };
                field.required
                    || field
                        .required_when
                        .as_ref()
                        .is_some_and(|c| c.evaluate(self.state))
            }
        }
    }

    pub fn is_field_read_only(&self, name: &str) -> bool {
        if SOURCE_FIELDS.contains(&name) {
            return true;
        }
        let by_mode = match self.mode {
            Mode::Exact => true,
            Mode::Partial => !PARTIAL_EDITABLE.contains(&name),
            Mode::Restructuring | Mode::New => name == ID_INSTRUMENTO,
            Mode::Idle => !IDLE_EDITABLE.contains(&name),
        };
        if by_mode {
            return true;
        }
        if let Some(config) = self.config {
            if config.is_force_read_only(name) {
                return true;
            }
            if config.find_field(name).is_some_and(|(_, f)| f.read_only) {
                return true;
            }
        }
        self.company_state == CompanyState::Selected
            && (name == ISSUER_TYPE_CODE || name == SECTOR_GICS)
    }

    pub fn is_section_visible(&self, section: &SectionConfig) -> bool {
        let Some(config) = self.config else {
            return false;
        };
        if !config.flow.iter().any(|id| *id == section.id) {
            return false;
        }
        match self.mode {
            Mode::Idle => false,
            Mode::New => self.step.is_some_and(|s| s.reveals(section.step)),
            Mode::Exact | Mode::Partial | Mode::Restructuring => true,
        }
    }

    pub fn is_group_visible(&self, section: &SectionConfig, group: &SectionGroup) -> bool {
        if !self.is_section_visible(section) {
            return false;
        }
        if self.mode == Mode::New && !self.step.is_some_and(|s| s.reveals(group.step)) {
            return false;
        }
        condition::evaluate(group.visible_when.as_ref(), self.state)
    }

    pub fn active_alerts<'s>(&self, section: &'s SectionConfig) -> Vec<&'s SectionAlert> {
        section
            .alerts
            .iter()
            .filter(|a| condition::evaluate(a.condition.as_ref(), self.state))
            .collect()
    }

    /// Full snapshot of what the form shows.
    pub fn form_view(&self) -> FormView {
        let sections = self
            .config
            .map(|config| {
                config
                    .flow
                    .iter()
                    .filter_map(|id| config.get_section(id))
                    .map(|section| self.section_view(section))
                    .collect()
            })
            .unwrap_or_default();
        let step_message = match (self.step, self.config) {
            (Some(StepPosition::Step(step)), Some(config)) => {
                config.step_message(step).map(str::to_string)
            }
            _ => None,
        };
        FormView {
            type_id: self.config.map(|c| c.id),
            mode: self.mode,
            company_state: self.company_state,
            step: self.step,
            step_message,
            sections,
        }
    }

    fn section_view(&self, section: &SectionConfig) -> SectionView {
        let visible = self.is_section_visible(section);
        SectionView {
            id: section.id.clone(),
            title: section.title.clone(),
            visible,
            fields: section
                .fields
                .iter()
                .map(|f| FieldView {
                    name: f.name.clone(),
                    label: f.label.clone(),
                    kind: f.kind,
                    visible: visible && self.is_field_visible(&f.name),
                    required: visible && self.is_field_required(&f.name),
                    read_only: self.is_field_read_only(&f.name),
                })
                .collect(),
            groups: section
                .groups
                .iter()
                .map(|g| GroupView {
                    id: g.id.clone(),
                    visible: self.is_group_visible(section, g),
                    fields: g.fields.clone(),
                })
                .collect(),
            alerts: if visible {
                self.active_alerts(section)
                    .into_iter()
                    .map(|a| AlertView {
                        severity: a.severity,
                        message: a.message.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub visible: bool,
    pub required: bool,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub id: String,
    pub visible: bool,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    pub severity: AlertSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub id: String,
    pub title: String,
    pub visible: bool,
    pub fields: Vec<FieldView>,
    pub groups: Vec<GroupView>,
    pub alerts: Vec<AlertView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub type_id: Option<u32>,
    pub mode: Mode,
    pub company_state: CompanyState,
    pub step: Option<StepPosition>,
    pub step_message: Option<String>,
    pub sections: Vec<SectionView>,
}

impl FormView {
    pub fn section(&self, id: &str) -> Option<&SectionView> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn field(&self, name: &str) -> Option<&FieldView> {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.name == name)
    }

    /// Names of fields currently shown and required.
    pub fn required_fields(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{derivative, equity, fixed_income, Registry};

    fn config(id: u32) -> Option<&'static AssetTypeConfig> {
        Registry::builtin().get(id)
    }

    fn bbg_bond() -> InstrumentRecord {
        InstrumentRecord::new()
            .with(INVESTMENT_TYPE_CODE, "1")
            .with(NAME_INSTRUMENTO, "BOND 2030")
            .with(PUBLIC_DATA_SOURCE, "Bloomberg")
    }

    #[test]
    fn test_no_config_shows_nothing() {
        let state = InstrumentRecord::new();
        let resolver = Resolver::new(None, &state, Mode::New, CompanyState::Writing);
        assert!(!resolver.is_field_visible(ISIN));
        assert!(!resolver.is_field_required(NAME_INSTRUMENTO));
        assert!(resolver.form_view().sections.is_empty());
    }

    #[test]
    fn test_bloomberg_fixed_income_requires_isin_only() {
        let state = bbg_bond();
        let resolver = Resolver::new(config(fixed_income::ID), &state, Mode::New, CompanyState::Writing);
        assert!(resolver.is_field_required(ISIN));
        assert!(!resolver.is_field_required(TICKER_BBG));
        assert_eq!(resolver.step(), Some(StepPosition::Step(2)));
    }

    #[test]
    fn test_equity_bloomberg_requires_ticker() {
        let state = bbg_bond().with(INVESTMENT_TYPE_CODE, "2");
        let resolver = Resolver::new(config(equity::ID), &state, Mode::New, CompanyState::Writing);
        assert!(resolver.is_field_required(TICKER_BBG));
        assert!(!resolver.is_field_required(ISIN));
    }

    #[test]
    fn test_exclusions_and_hidden_fields() {
        let state = InstrumentRecord::new().with(INVESTMENT_TYPE_CODE, "7");
        let resolver = Resolver::new(config(derivative::ID), &state, Mode::New, CompanyState::Writing);
        assert!(!resolver.is_field_visible(ISIN));
        assert!(!resolver.is_field_visible(COUPON_TYPE_CODE));
        assert!(resolver.is_field_visible(SUB_ID));
        assert!(resolver.is_field_read_only(RISK_COUNTRY));
        assert!(resolver.is_field_read_only(ISSUE_CURRENCY));
    }

    #[test]
    fn test_visible_when_hides_chilean_sector() {
        let state = bbg_bond().with(RISK_COUNTRY, "US");
        let resolver = Resolver::new(config(fixed_income::ID), &state, Mode::New, CompanyState::Writing);
        assert!(!resolver.is_field_visible(SECTOR_CHILE_TYPE_CODE));
        assert!(!resolver.is_field_required(SECTOR_CHILE_TYPE_CODE));

        let chile = bbg_bond().with(ISSUE_COUNTRY, "CL");
        let resolver = Resolver::new(config(fixed_income::ID), &chile, Mode::New, CompanyState::Writing);
        assert!(resolver.is_field_visible(SECTOR_CHILE_TYPE_CODE));
        assert!(resolver.is_field_required(SECTOR_CHILE_TYPE_CODE));
    }

    #[test]
    fn test_exact_mode_is_read_only_and_not_required() {
        let state = bbg_bond();
        let resolver = Resolver::new(config(fixed_income::ID), &state, Mode::Exact, CompanyState::Writing);
        for name in [NAME_INSTRUMENTO, ISIN, ISSUE_CURRENCY, COUPON_TYPE_CODE] {
            assert!(resolver.is_field_read_only(name), "{} editable", name);
            assert!(!resolver.is_field_required(name), "{} required", name);
        }
        assert_eq!(resolver.step(), None);
    }

    #[test]
    fn test_partial_mode_only_currencies() {
        let state = bbg_bond();
        let resolver = Resolver::new(config(fixed_income::ID), &state, Mode::Partial, CompanyState::Writing);
        assert!(resolver.is_field_required(ISSUE_CURRENCY));
        assert!(resolver.is_field_required(RISK_CURRENCY));
        assert!(!resolver.is_field_read_only(RISK_CURRENCY));
        assert!(!resolver.is_field_required(NAME_INSTRUMENTO));
        assert!(resolver.is_field_read_only(NAME_INSTRUMENTO));
        assert!(!resolver.is_field_read_only(ES_REESTRUCTURACION));
        assert!(!resolver.is_field_required(ES_REESTRUCTURACION));
        let view = resolver.form_view();
        assert_eq!(view.required_fields(), vec![ISSUE_CURRENCY, RISK_CURRENCY]);
    }

    #[test]
    fn test_selected_company_locks_issuer_and_sector() {
        let state = bbg_bond();
        let resolver = Resolver::new(config(fixed_income::ID), &state, Mode::New, CompanyState::Selected);
        assert!(resolver.is_field_read_only(ISSUER_TYPE_CODE));
        assert!(resolver.is_field_read_only(SECTOR_GICS));
        assert!(!resolver.is_field_read_only(COMPANY_NAME));
    }

    #[test]
    fn test_source_fields_always_read_only() {
        let state = InstrumentRecord::new();
        for mode in [Mode::Idle, Mode::New, Mode::Restructuring] {
            let resolver = Resolver::new(config(fixed_income::ID), &state, mode, CompanyState::Writing);
            assert!(resolver.is_field_read_only(MONEDA));
            assert!(resolver.is_field_read_only(FUENTE));
        }
        let restructuring =
            Resolver::new(config(fixed_income::ID), &state, Mode::Restructuring, CompanyState::Writing);
        assert!(restructuring.is_field_read_only(ID_INSTRUMENTO));
        let idle = Resolver::new(None, &state, Mode::Idle, CompanyState::Writing);
        assert!(!idle.is_field_read_only(ID_INSTRUMENTO));
        assert!(!idle.is_field_read_only(INVESTMENT_TYPE_CODE));
    }

    #[test]
    fn test_sections_follow_the_wizard() {
        let state = bbg_bond();
        let resolver = Resolver::new(config(fixed_income::ID), &state, Mode::New, CompanyState::Writing);
        let view = resolver.form_view();
        assert!(view.section("identifiers").unwrap().visible);
        assert!(!view.section("company").unwrap().visible);
        assert!(!view.section("parameters").unwrap().visible);
        assert_eq!(
            view.step_message.as_deref(),
            Some("Paso 2: Seleccione la fuente de datos y complete ISIN.")
        );
        let identifiers = view.section("identifiers").unwrap();
        assert_eq!(identifiers.alerts.len(), 1);
        assert!(identifiers.groups.iter().all(|g| g.visible));
    }

    #[test]
    fn test_other_modes_show_all_sections() {
        let state = bbg_bond();
        for (mode, expected) in [(Mode::Restructuring, true), (Mode::Exact, true), (Mode::Idle, false)] {
            let resolver = Resolver::new(config(fixed_income::ID), &state, mode, CompanyState::Writing);
            let view = resolver.form_view();
            assert!(view.sections.iter().all(|s| s.visible == expected), "{}", mode);
        }
    }

    #[test]
    fn test_group_visible_when() {
        let state = InstrumentRecord::new().with(INVESTMENT_TYPE_CODE, "1");
        let resolver = Resolver::new(config(fixed_income::ID), &state, Mode::Exact, CompanyState::Writing);
        let view = resolver.form_view();
        let step2 = view
            .section("identifiers")
            .and_then(|s| s.groups.iter().find(|g| g.id == "step2"))
            .unwrap();
        assert!(!step2.visible);
    }
}
