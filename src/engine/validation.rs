//! Draft validation before save.
//!
//! One issue per field at most. Errors block saving, warnings never do, and
//! nothing here ever blocks editing.

use super::condition::Condition;
use super::visibility::Resolver;
use crate::domain::fields::*;
use crate::domain::{CompanyState, InstrumentRecord, Mode};
use crate::registry::schema::FieldConfig;
use crate::registry::{AssetTypeConfig, Severity, ValidationRule};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// Issues keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    issues: BTreeMap<String, ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue. An error displaces a warning on the same field;
    /// otherwise the first issue stays.
    pub fn push(&mut self, issue: ValidationIssue) {
        match self.issues.get(&issue.field) {
            Some(existing) if existing.severity >= issue.severity => {}
            _ => {
                self.issues.insert(issue.field.clone(), issue);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&ValidationIssue> {
        self.issues.get(field)
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.values()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues().filter(|i| i.severity == Severity::Warning)
    }

    pub fn has_blocking_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }
}

fn isin_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{10}$").expect("valid ISIN pattern"))
}

fn sedol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{7}$").expect("valid SEDOL pattern"))
}

fn cusip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{9}$").expect("valid CUSIP pattern"))
}

/// Format check for a filled field.
fn format_error(name: &str, value: &str, field: Option<&FieldConfig>) -> Option<String> {
    let length = value.chars().count();
    let message = match name {
        ISIN if !isin_pattern().is_match(value) => {
            "ISIN debe tener formato: 2 letras + 10 caracteres alfanumericos".to_string()
        }
        SEDOL if !sedol_pattern().is_match(value) => {
            "SEDOL debe tener 7 caracteres alfanumericos".to_string()
        }
        CUSIP if !cusip_pattern().is_match(value) => {
            "CUSIP debe tener 9 caracteres alfanumericos".to_string()
        }
        TICKER_BBG if length > 50 => "TickerBBG no puede exceder 50 caracteres".to_string(),
        COMPANY_NAME if length < 2 => "Nombre de compania es requerido".to_string(),
        DIA_VALIDEZ if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() => {
            "Dia de validez debe tener formato AAAA-MM-DD".to_string()
        }
        _ => {
            let max = field.and_then(|f| f.max_length)?;
            if length <= max {
                return None;
            }
            format!("Maximo {} caracteres", max)
        }
    };
    Some(message)
}

fn check_rule(rule: &ValidationRule, state: &InstrumentRecord) -> bool {
    match rule {
        ValidationRule::BloombergRequires { field } => {
            !Condition::bloomberg_source().evaluate(state) || state.is_filled(field)
        }
        ValidationRule::AtLeastOneIdentifier => {
            Condition::bloomberg_source().evaluate(state)
                || SECURITY_IDENTIFIERS.iter().any(|f| state.is_filled(f))
        }
        ValidationRule::AllowedValues { field, values } => state
            .get(field)
            .and_then(|v| v.as_integer())
            .is_some_and(|v| values.contains(&v)),
        ValidationRule::Present { field } => state.is_filled(field),
    }
}

/// Validate `state` under its type and mode.
///
/// `duplicates` holds messages from the duplicate-value check, keyed by field.
pub fn validate(
    config: Option<&AssetTypeConfig>,
    mode: Mode,
    state: &InstrumentRecord,
    company_state: CompanyState,
    duplicates: &BTreeMap<String, String>,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    let resolver = Resolver::new(config, state, mode, company_state);

    if let Some(config) = config {
        for field in config.sections.iter().flat_map(|s| s.fields.iter()) {
            if resolver.is_field_required(&field.name) && !state.is_filled(&field.name) {
                report.push(ValidationIssue::error(
                    &field.name,
                    format!("{} es requerido", field.label),
                ));
            }
        }
    } else if matches!(mode, Mode::New | Mode::Restructuring) {
        report.push(ValidationIssue::error(
            INVESTMENT_TYPE_CODE,
            "Tipo de inversion es requerido",
        ));
    }

    if mode == Mode::Restructuring {
        for name in [ID_PREDECESOR, MONEDA_PREDECESOR, TIPO_CONTINUADOR, DIA_VALIDEZ] {
            if !state.is_filled(name) {
                report.push(ValidationIssue::error(name, format!("{} es requerido", name)));
            }
        }
    }

    for name in state.filled_fields() {
        let value = state.text(name);
        let field = config.and_then(|c| c.find_field(name)).map(|(_, f)| f);
        if let Some(message) = format_error(name, &value, field) {
            report.push(ValidationIssue::error(name, message));
        }
    }

    if let (Some(config), Mode::New | Mode::Restructuring) = (config, mode) {
        for validation in &config.validations {
            if !check_rule(&validation.rule, state) {
                report.push(ValidationIssue {
                    field: validation.target_field().to_string(),
                    message: validation.message.clone(),
                    severity: validation.severity,
                });
            }
        }
    }

    for (field, message) in duplicates {
        report.push(ValidationIssue::error(field, message.clone()));
    }

    report
}
