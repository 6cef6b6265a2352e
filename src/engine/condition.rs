//! Boolean condition trees evaluated against a record snapshot.
//!
//! Evaluation is total: missing fields read as empty and no input can make it
//! fail.

use crate::domain::{fields, FieldValue, InstrumentRecord};
use serde::{Deserialize, Serialize};

/// A closed condition language. The JSON shape mirrors the declarative
/// configuration format, e.g. `{"field": "riskCountry", "equals": "CL"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Equals {
        field: String,
        equals: String,
    },
    NotEquals {
        field: String,
        #[serde(rename = "notEquals")]
        not_equals: String,
    },
    Matches {
        field: String,
        matches: Vec<String>,
    },
    FieldsComplete {
        #[serde(rename = "fieldsComplete")]
        fields_complete: Vec<String>,
    },
    FieldsAnyComplete {
        #[serde(rename = "fieldsAnyComplete")]
        fields_any_complete: Vec<String>,
    },
    And {
        and: Vec<Condition>,
    },
    Or {
        or: Vec<Condition>,
    },
}

impl Condition {
    pub fn equals(field: &str, value: &str) -> Self {
        Condition::Equals {
            field: field.to_string(),
            equals: value.to_string(),
        }
    }

    pub fn not_equals(field: &str, value: &str) -> Self {
        Condition::NotEquals {
            field: field.to_string(),
            not_equals: value.to_string(),
        }
    }

    pub fn matches(field: &str, values: &[&str]) -> Self {
        Condition::Matches {
            field: field.to_string(),
            matches: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn fields_complete(names: &[&str]) -> Self {
        Condition::FieldsComplete {
            fields_complete: names.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn fields_any_complete(names: &[&str]) -> Self {
        Condition::FieldsAnyComplete {
            fields_any_complete: names.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And { and: conditions }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or { or: conditions }
    }

    /// The data source is Bloomberg under any of its encodings.
    pub fn bloomberg_source() -> Self {
        Condition::matches(fields::PUBLIC_DATA_SOURCE, fields::BLOOMBERG_SYNONYMS)
    }

    /// Either country of the instrument is Chile.
    pub fn chilean_exposure() -> Self {
        Condition::or(vec![
            Condition::equals(fields::RISK_COUNTRY, "CL"),
            Condition::equals(fields::ISSUE_COUNTRY, "CL"),
        ])
    }

    pub fn evaluate(&self, state: &InstrumentRecord) -> bool {
        match self {
            Condition::Equals { field, equals } => state.text(field) == equals.trim(),
            Condition::NotEquals { field, not_equals } => state.text(field) != not_equals.trim(),
            Condition::Matches { field, matches } => {
                let value = state.text(field).to_lowercase();
                matches.iter().any(|m| m.trim().to_lowercase() == value)
            }
            Condition::FieldsComplete { fields_complete } => {
                fields_complete.iter().all(|f| state.is_filled(f))
            }
            Condition::FieldsAnyComplete {
                fields_any_complete,
            } => fields_any_complete.iter().any(|f| state.is_filled(f)),
            Condition::And { and } => and.iter().all(|c| c.evaluate(state)),
            Condition::Or { or } => or.iter().any(|c| c.evaluate(state)),
        }
    }

    /// Every field name the condition reads.
    pub fn referenced_fields(&self) -> Vec<&str> {
        match self {
            Condition::Equals { field, .. }
            | Condition::NotEquals { field, .. }
            | Condition::Matches { field, .. } => vec![field.as_str()],
            Condition::FieldsComplete { fields_complete } => {
                fields_complete.iter().map(String::as_str).collect()
            }
            Condition::FieldsAnyComplete {
                fields_any_complete,
            } => fields_any_complete.iter().map(String::as_str).collect(),
            Condition::And { and: nested } | Condition::Or { or: nested } => {
                nested.iter().flat_map(|c| c.referenced_fields()).collect()
            }
        }
    }
}

/// A test on the incoming value of a field, used to gate cascades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueGate {
    Equals(String),
    NotEquals(String),
}

impl ValueGate {
    pub fn allows(&self, value: &FieldValue) -> bool {
        match self {
            ValueGate::Equals(expected) => value.loosely_equals(expected),
            ValueGate::NotEquals(expected) => !value.loosely_equals(expected),
        }
    }
}

/// An absent condition holds unconditionally.
pub fn evaluate(condition: Option<&Condition>, state: &InstrumentRecord) -> bool {
    condition.map_or(true, |c| c.evaluate(state))
}
