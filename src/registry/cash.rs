//! Cash (type 3).

use super::factory;
use super::schema::{
    AssetTypeConfig, FieldConfig, FlowStep, SectionConfig, TypeValidation, ValidationRule,
};
use crate::domain::fields::*;

pub const ID: u32 = 3;

pub fn config() -> AssetTypeConfig {
    AssetTypeConfig::new(ID, "Cash (Efectivo)")
        .section(factory::optional_identifiers_section(
            "Cash no requiere Public_Data_Source. Todos los identificadores son opcionales.",
        ))
        .section(factory::fixed_company_section(3, "[CASH & EQUIV.]", "88888888"))
        .section(factory::placeholder_geography_section(4, "[Cash & Eq]"))
        .section(
            SectionConfig::new("parameters", "Parametros Cash").at_step(5).field(
                FieldConfig::select(CASH_TYPE_CODE, "Cash_Type_Code", "cashTypes").required(),
            ),
        )
        .step(factory::step_type_and_name())
        .step(FlowStep::new(
            2,
            &[],
            "Paso 2: Complete los identificadores (todos opcionales).",
        ))
        .step(factory::step_company(3))
        .step(factory::step_geography(4))
        .step(FlowStep::new(
            5,
            &[CASH_TYPE_CODE],
            "Paso 5: Seleccione el tipo de efectivo.",
        ))
        .validation(TypeValidation::error(
            "cashTypeRequired",
            ValidationRule::Present {
                field: CASH_TYPE_CODE.to_string(),
            },
            "El tipo de efectivo es obligatorio",
        ))
        .auto_populate(ISSUE_CURRENCY, MONEDA)
        .auto_populate(RISK_CURRENCY, MONEDA)
        .exclude(factory::NO_SOURCE_EXCLUSIONS)
        .exclude(&[
            SECTOR_CHILE_TYPE_CODE,
            EMISION_NACIONAL,
            BANK_DEBT_TYPE_CODE,
            FUND_TYPE_CODE,
        ])
}
