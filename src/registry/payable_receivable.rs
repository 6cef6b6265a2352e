//! Payables and receivables (type 4): cash-like, without a parameters section.

use super::factory;
use super::schema::{AssetTypeConfig, FlowStep};
use crate::domain::fields::*;

pub const ID: u32 = 4;

pub fn config() -> AssetTypeConfig {
    AssetTypeConfig::new(ID, "Payable/Receivable")
        .section(factory::optional_identifiers_section(
            "Payable/Receivable no requiere Public_Data_Source. Todos los identificadores son opcionales.",
        ))
        .section(factory::fixed_company_section(3, "[CASH & EQUIV.]", "88888888"))
        .section(factory::placeholder_geography_section(4, "[Cash & Eq]"))
        .step(factory::step_type_and_name())
        .step(FlowStep::new(
            2,
            &[],
            "Paso 2: Complete los identificadores (todos opcionales).",
        ))
        .step(factory::step_company(3))
        .step(factory::step_geography(4))
        .auto_populate(ISSUE_CURRENCY, MONEDA)
        .auto_populate(RISK_CURRENCY, MONEDA)
        .exclude(factory::NO_SOURCE_EXCLUSIONS)
        .exclude(&[
            SECTOR_CHILE_TYPE_CODE,
            EMISION_NACIONAL,
            CASH_TYPE_CODE,
            BANK_DEBT_TYPE_CODE,
            FUND_TYPE_CODE,
        ])
}
