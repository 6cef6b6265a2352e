//! Declarative configuration schema for asset types.
//!
//! A configuration is a complete, immutable value: sections and their fields,
//! the ordered wizard steps, validations, auto-populate rules and exclusions.

use crate::domain::{fields, FieldValue};
use crate::engine::condition::{Condition, ValueGate};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Select,
    Number,
    Date,
    Company,
}

/// A fixed option for selects that do not come from a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_when: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Condition>,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cascade: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade_condition: Option<ValueGate>,
    pub priority_identifier: bool,
    pub read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl FieldConfig {
    fn base(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: false,
            required_when: None,
            visible_when: None,
            hidden: false,
            default_value: None,
            cascade: Vec::new(),
            cascade_condition: None,
            priority_identifier: false,
            read_only: false,
            options_key: None,
            options: Vec::new(),
            max_length: None,
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::base(name, label, FieldKind::Text)
    }

    pub fn number(name: &str, label: &str) -> Self {
        Self::base(name, label, FieldKind::Number)
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::base(name, label, FieldKind::Date)
    }

    pub fn company(name: &str, label: &str) -> Self {
        Self::base(name, label, FieldKind::Company)
    }

    pub fn select(name: &str, label: &str, options_key: &str) -> Self {
        let mut field = Self::base(name, label, FieldKind::Select);
        field.options_key = Some(options_key.to_string());
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn required_when(mut self, condition: Condition) -> Self {
        self.required_when = Some(condition);
        self
    }

    pub fn visible_when(mut self, condition: Condition) -> Self {
        self.visible_when = Some(condition);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// A fixed value: read-only and seeded when the type is chosen.
    pub fn fixed(mut self, value: &str) -> Self {
        self.default_value = Some(FieldValue::text(value));
        self.read_only = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn cascade(mut self, names: &[&str], gate: Option<ValueGate>) -> Self {
        self.cascade = names.iter().map(|n| n.to_string()).collect();
        self.cascade_condition = gate;
        self
    }

    pub fn priority(mut self) -> Self {
        self.priority_identifier = true;
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    /// True when the type pins this field to a constant.
    pub fn is_fixed(&self) -> bool {
        self.read_only && self.default_value.is_some()
    }
}

/// A visual sub-block of a section, optionally gated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionGroup {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Condition>,
    pub fields: Vec<String>,
}

impl SectionGroup {
    pub fn new(id: &str, names: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            step: None,
            visible_when: None,
            fields: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn at_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn visible_when(mut self, condition: Condition) -> Self {
        self.visible_when = Some(condition);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
}

/// An informational banner shown with a section while its condition holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionAlert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub severity: AlertSeverity,
    pub message: String,
}

impl SectionAlert {
    pub fn info(message: &str) -> Self {
        Self {
            condition: None,
            severity: AlertSeverity::Info,
            message: message.to_string(),
        }
    }

    pub fn warning(message: &str) -> Self {
        Self {
            condition: None,
            severity: AlertSeverity::Warning,
            message: message.to_string(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionConfig {
    pub id: String,
    pub title: String,
    /// Wizard step at which the section is revealed; `None` shows it from the start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    pub fields: Vec<FieldConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<SectionGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hidden_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<SectionAlert>,
}

impl SectionConfig {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            step: None,
            fields: Vec::new(),
            groups: Vec::new(),
            hidden_fields: Vec::new(),
            alerts: Vec::new(),
        }
    }

    pub fn at_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldConfig>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn group(mut self, group: SectionGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn hide(mut self, names: &[&str]) -> Self {
        self.hidden_fields.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn alert(mut self, alert: SectionAlert) -> Self {
        self.alerts.push(alert);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn hides(&self, name: &str) -> bool {
        self.hidden_fields.iter().any(|h| h == name)
    }
}

/// Fields required only while a condition holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalFields {
    pub condition: Condition,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    pub id: u32,
    pub required_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditional_fields: Vec<ConditionalFields>,
    pub message: String,
}

impl FlowStep {
    pub fn new(id: u32, required: &[&str], message: &str) -> Self {
        Self {
            id,
            required_fields: required.iter().map(|n| n.to_string()).collect(),
            conditional_fields: Vec::new(),
            message: message.to_string(),
        }
    }

    /// Require `names` as well while `condition` holds.
    pub fn when(mut self, condition: Condition, names: &[&str]) -> Self {
        self.conditional_fields.push(ConditionalFields {
            condition,
            fields: names.iter().map(|n| n.to_string()).collect(),
        });
        self
    }

    /// Every field this step can require.
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.required_fields.iter().map(String::as_str).chain(
            self.conditional_fields
                .iter()
                .flat_map(|c| c.fields.iter().map(String::as_str)),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// The predicate behind a named type validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationRule {
    /// Bloomberg-sourced instruments must carry this identifier.
    BloombergRequires { field: String },
    /// Non-Bloomberg instruments should carry some identifier.
    AtLeastOneIdentifier,
    /// The field must hold one of these integers.
    AllowedValues { field: String, values: Vec<i64> },
    /// The field must be filled.
    Present { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeValidation {
    pub name: String,
    pub rule: ValidationRule,
    pub message: String,
    pub severity: Severity,
}

impl TypeValidation {
    pub fn error(name: &str, rule: ValidationRule, message: &str) -> Self {
        Self {
            name: name.to_string(),
            rule,
            message: message.to_string(),
            severity: Severity::Error,
        }
    }

    pub fn warning(name: &str, rule: ValidationRule, message: &str) -> Self {
        Self {
            name: name.to_string(),
            rule,
            message: message.to_string(),
            severity: Severity::Warning,
        }
    }

    /// Field the issue is reported against.
    pub fn target_field(&self) -> &str {
        match &self.rule {
            ValidationRule::BloombergRequires { field }
            | ValidationRule::AllowedValues { field, .. }
            | ValidationRule::Present { field } => field,
            ValidationRule::AtLeastOneIdentifier => fields::ISIN,
        }
    }
}

/// Copy `source` into `target` when the type is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoPopulate {
    pub target: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTypeConfig {
    pub id: u32,
    pub label: String,
    pub flow: Vec<String>,
    pub steps: Vec<FlowStep>,
    pub sections: Vec<SectionConfig>,
    pub validations: Vec<TypeValidation>,
    pub auto_populate: Vec<AutoPopulate>,
    pub excluded_fields: Vec<String>,
    pub reestructuracion_exclusions: Vec<String>,
    pub force_read_only: Vec<String>,
}

impl AssetTypeConfig {
    pub fn new(id: u32, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            flow: Vec::new(),
            steps: Vec::new(),
            sections: Vec::new(),
            validations: Vec::new(),
            auto_populate: Vec::new(),
            excluded_fields: Vec::new(),
            reestructuracion_exclusions: fields::RESTRUCTURING_BASE_EXCLUSIONS
                .iter()
                .map(|n| n.to_string())
                .collect(),
            force_read_only: Vec::new(),
        }
    }

    /// Append a section; it joins the flow in declaration order.
    pub fn section(mut self, section: SectionConfig) -> Self {
        self.flow.push(section.id.clone());
        self.sections.push(section);
        self
    }

    pub fn step(mut self, step: FlowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn validation(mut self, validation: TypeValidation) -> Self {
        self.validations.push(validation);
        self
    }

    pub fn auto_populate(mut self, target: &str, source: &str) -> Self {
        self.auto_populate.push(AutoPopulate {
            target: target.to_string(),
            source: source.to_string(),
        });
        self
    }

    pub fn exclude(mut self, names: &[&str]) -> Self {
        self.excluded_fields.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Extra fields not inherited from a predecessor, on top of the base list.
    pub fn restructuring_exclusions(mut self, names: &[&str]) -> Self {
        for name in names {
            if !self.reestructuracion_exclusions.iter().any(|n| n == name) {
                self.reestructuracion_exclusions.push(name.to_string());
            }
        }
        self
    }

    pub fn force_read_only(mut self, names: &[&str]) -> Self {
        self.force_read_only.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn get_section(&self, id: &str) -> Option<&SectionConfig> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// The section declaring `name` and its configuration.
    pub fn find_field(&self, name: &str) -> Option<(&SectionConfig, &FieldConfig)> {
        self.sections
            .iter()
            .find_map(|s| s.get_field(name).map(|f| (s, f)))
    }

    pub fn default_value(&self, name: &str) -> Option<&FieldValue> {
        self.find_field(name)
            .and_then(|(_, f)| f.default_value.as_ref())
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_fields.iter().any(|n| n == name)
    }

    pub fn is_force_read_only(&self, name: &str) -> bool {
        self.force_read_only.iter().any(|n| n == name)
    }

    /// True when the type pins `name` to a constant value.
    pub fn fixes_field(&self, name: &str) -> bool {
        self.find_field(name).is_some_and(|(_, f)| f.is_fixed())
    }

    pub fn declared_fields(&self) -> BTreeSet<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter().map(|f| f.name.as_str()))
            .collect()
    }

    pub fn step_message(&self, step: u32) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.id == step)
            .map(|s| s.message.as_str())
    }

    /// Step and group field references with no declaring section.
    pub fn undeclared_references(&self) -> Vec<String> {
        let declared = self.declared_fields();
        let step_fields = self.steps.iter().flat_map(|s| s.all_fields());
        let group_fields = self
            .sections
            .iter()
            .flat_map(|s| s.groups.iter().flat_map(|g| g.fields.iter().map(String::as_str)));
        let mut missing: Vec<String> = step_fields
            .chain(group_fields)
            .filter(|name| !declared.contains(name) && !self.is_excluded(name))
            .map(str::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}
