//! Editing modes and company selection state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Editing state of a draft. Exactly one is active per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// No mode chosen yet.
    #[default]
    Idle,
    /// Identifier and currency match an existing record.
    Exact,
    /// Identifier matches but currency differs.
    Partial,
    /// Brand-new instrument, guided by the step wizard.
    New,
    /// New instrument continuing a predecessor.
    Restructuring,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Exact => "exact",
            Mode::Partial => "partial",
            Mode::New => "new",
            Mode::Restructuring => "restructuring",
        }
    }

    /// Modes that persist by updating an existing record.
    pub fn updates_existing(&self) -> bool {
        matches!(self, Mode::Exact | Mode::Partial)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the company on the draft is being typed, is new, or was matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyState {
    #[default]
    Writing,
    New,
    Selected,
}

impl CompanyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyState::Writing => "writing",
            CompanyState::New => "new",
            CompanyState::Selected => "selected",
        }
    }
}

impl fmt::Display for CompanyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serde_lowercase() {
        let json = serde_json::to_string(&Mode::Restructuring).unwrap();
        assert_eq!(json, "\"restructuring\"");
        let mode: Mode = serde_json::from_str("\"partial\"").unwrap();
        assert_eq!(mode, Mode::Partial);
    }

    #[test]
    fn test_updates_existing() {
        assert!(Mode::Exact.updates_existing());
        assert!(Mode::Partial.updates_existing());
        assert!(!Mode::New.updates_existing());
        assert!(!Mode::Restructuring.updates_existing());
    }
}
