//! Company records and catalog entries consumed from external services.

use serde::{Deserialize, Serialize};

/// An issuer company as returned by the company service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_type_code: Option<String>,
    #[serde(rename = "sectorGICS", default, skip_serializing_if = "Option::is_none")]
    pub sector_gics: Option<String>,
}

impl Company {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            id: None,
            company_name: company_name.into(),
            issuer_type_code: None,
            sector_gics: None,
        }
    }

    pub fn with_issuer_type(mut self, code: impl Into<String>) -> Self {
        self.issuer_type_code = Some(code.into());
        self
    }

    pub fn with_sector(mut self, code: impl Into<String>) -> Self {
        self.sector_gics = Some(code.into());
        self
    }

    /// Names are matched ignoring surrounding whitespace and case.
    pub fn matches_name(&self, name: &str) -> bool {
        self.company_name.trim().eq_ignore_ascii_case(name.trim())
    }
}

/// One option of a named catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub activo: bool,
}

fn default_active() -> bool {
    true
}

impl CatalogEntry {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            description: None,
            activo: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.activo = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_json_shape() {
        let company = Company::new("ACME SA").with_sector("45102010");
        let json = serde_json::to_value(&company).unwrap();
        assert_eq!(json["companyName"], "ACME SA");
        assert_eq!(json["sectorGICS"], "45102010");
        assert!(json.get("issuerTypeCode").is_none());
    }

    #[test]
    fn test_catalog_entry_defaults_active() {
        let entry: CatalogEntry = serde_json::from_str(r#"{"value":"CL","label":"Chile"}"#).unwrap();
        assert!(entry.activo);
    }

    #[test]
    fn test_matches_name_ignores_case() {
        assert!(Company::new("Acme SA").matches_name(" ACME sa "));
        assert!(!Company::new("Acme SA").matches_name("Acme"));
    }
}
