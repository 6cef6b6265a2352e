//! Fund (type 6).

use super::factory;
use super::schema::{
    AssetTypeConfig, FieldConfig, FlowStep, SectionAlert, SectionConfig, SectionGroup,
    TypeValidation, ValidationRule,
};
use crate::domain::fields::*;

pub const ID: u32 = 6;

pub fn config() -> AssetTypeConfig {
    AssetTypeConfig::new(ID, "Fondos")
        .section(factory::optional_identifiers_section(
            "Los fondos no requieren Public_Data_Source. Todos los identificadores son opcionales.",
        ))
        .section(factory::fixed_company_section(3, "[FUND]", "66666666"))
        .section(definition())
        .section(
            SectionConfig::new("parameters", "Parametros Fondo").at_step(5).field(
                FieldConfig::select(FUND_TYPE_CODE, "Fund_Type_Code", "fundTypes").required(),
            ),
        )
        .step(factory::step_type_and_name())
        .step(FlowStep::new(
            2,
            &[],
            "Paso 2: Complete los identificadores del fondo (todos opcionales).",
        ))
        .step(factory::step_company(3))
        .step(factory::step_geography(4))
        .step(FlowStep::new(
            5,
            &[FUND_TYPE_CODE],
            "Paso 5: Seleccione el tipo de fondo.",
        ))
        .validation(TypeValidation::error(
            "fundTypeRequired",
            ValidationRule::Present {
                field: FUND_TYPE_CODE.to_string(),
            },
            "El tipo de fondo es obligatorio",
        ))
        .auto_populate(ISSUE_CURRENCY, MONEDA)
        .auto_populate(RISK_CURRENCY, MONEDA)
        .exclude(factory::NO_SOURCE_EXCLUSIONS)
        .exclude(&[
            SECTOR_CHILE_TYPE_CODE,
            EMISION_NACIONAL,
            CASH_TYPE_CODE,
            BANK_DEBT_TYPE_CODE,
        ])
}

/// Issue country stays editable; risk country is pinned to `[Fund]`.
fn definition() -> SectionConfig {
    SectionConfig::new("definition", "Definicion Geografica")
        .at_step(4)
        .fields([
            factory::issue_country(),
            FieldConfig::select(RISK_COUNTRY, "Risk_Country", "paises")
                .required()
                .fixed("[Fund]"),
            factory::issue_currency().read_only(),
            factory::risk_currency().read_only(),
        ])
        .group(SectionGroup::new(
            "geography",
            &[ISSUE_COUNTRY, RISK_COUNTRY, ISSUE_CURRENCY, RISK_CURRENCY],
        ))
        .alert(SectionAlert::info(
            "Para Fondos: Risk Country = [Fund], currencies = moneda de cola (auto-completados).",
        ))
}
