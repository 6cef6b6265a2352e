//! Bank Debt (type 5): a loan from a real lender, so the company is editable
//! and geography follows the lender's domicile.

use super::factory;
use super::schema::{
    AssetTypeConfig, FieldConfig, FlowStep, SectionConfig, TypeValidation, ValidationRule,
};
use crate::domain::fields::*;

pub const ID: u32 = 5;

pub fn config() -> AssetTypeConfig {
    AssetTypeConfig::new(ID, "Bank Debt")
        .section(factory::optional_identifiers_section(
            "Bank Debt no requiere Public_Data_Source. Todos los identificadores son opcionales.",
        ))
        .section(factory::editable_company_section(3))
        .section(factory::geography_section(4, false))
        .section(
            SectionConfig::new("parameters", "Parametros Deuda Bancaria")
                .at_step(5)
                .field(
                    FieldConfig::select(BANK_DEBT_TYPE_CODE, "Bank_Debt_Type_Code", "bankDebtTypes")
                        .required(),
                ),
        )
        .step(factory::step_type_and_name())
        .step(FlowStep::new(
            2,
            &[],
            "Paso 2: Complete los identificadores (todos opcionales).",
        ))
        .step(factory::step_company(3))
        .step(factory::step_geography_with_chile(4))
        .step(FlowStep::new(
            5,
            &[BANK_DEBT_TYPE_CODE],
            "Paso 5: Seleccione el tipo de deuda bancaria.",
        ))
        .validation(TypeValidation::error(
            "bankDebtTypeRequired",
            ValidationRule::Present {
                field: BANK_DEBT_TYPE_CODE.to_string(),
            },
            "El tipo de deuda bancaria es obligatorio",
        ))
        .exclude(factory::NO_SOURCE_EXCLUSIONS)
        .exclude(&[EMISION_NACIONAL, CASH_TYPE_CODE, FUND_TYPE_CODE])
}
