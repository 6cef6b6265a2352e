//! Derivative (type 7): no identifiers, fixed placeholder company and
//! geography, currencies copied from the queue item, and a mandatory leg
//! selector.

use super::factory;
use super::schema::{
    AssetTypeConfig, FieldConfig, FieldOption, FlowStep, SectionAlert, SectionConfig,
    SectionGroup, TypeValidation, ValidationRule,
};
use crate::domain::fields::*;

pub const ID: u32 = 7;

/// Long (asset) and short (liability) legs.
pub const SUB_ID_LEGS: [i64; 2] = [10000, 20000];

pub fn config() -> AssetTypeConfig {
    AssetTypeConfig::new(ID, "Derivados")
        .section(identifiers())
        .section(factory::fixed_company_section(2, "[DERIV]", "77777777"))
        .section(parameters())
        .step(factory::step_type_and_name())
        .step(factory::step_company(2))
        .step(FlowStep::new(
            3,
            &[SUB_ID, ISSUE_COUNTRY, RISK_COUNTRY, ISSUE_CURRENCY, RISK_CURRENCY],
            "Paso 3: Seleccione el SubID del derivado.",
        ))
        .validation(TypeValidation::error(
            "subIdRequired",
            ValidationRule::AllowedValues {
                field: SUB_ID.to_string(),
                values: SUB_ID_LEGS.to_vec(),
            },
            "SubID es OBLIGATORIO para derivados (10000 o 20000)",
        ))
        .auto_populate(ISSUE_CURRENCY, MONEDA)
        .auto_populate(RISK_CURRENCY, MONEDA)
        .force_read_only(&[ISSUE_CURRENCY, RISK_CURRENCY])
        .exclude(&[
            PUBLIC_DATA_SOURCE,
            ISIN,
            TICKER_BBG,
            SEDOL,
            CUSIP,
            SECTOR_CHILE_TYPE_CODE,
            EMISION_NACIONAL,
            COUPON_TYPE_CODE,
            YIELD_TYPE,
            YIELD_SOURCE,
            PERPETUIDAD,
            RENDIMIENTO,
            COUPON_FREQUENCY,
            COCO,
            CALLABLE,
            SINKABLE,
            YAS_YLD_FLAG,
            CASH_TYPE_CODE,
            BANK_DEBT_TYPE_CODE,
            FUND_TYPE_CODE,
        ])
}

fn identifiers() -> SectionConfig {
    SectionConfig::new("identifiers", "Identificadores")
        .fields([factory::investment_type(), factory::instrument_name()])
        .group(factory::step_one_group())
        .hide(&[PUBLIC_DATA_SOURCE, ISIN, TICKER_BBG, SEDOL, CUSIP])
        .alert(SectionAlert::info(
            "Los derivados no requieren identificadores (ISIN, TickerBBG, etc.)",
        ))
}

fn parameters() -> SectionConfig {
    SectionConfig::new("parameters", "Parametros Derivado")
        .at_step(3)
        .fields([
            FieldConfig::number(SUB_ID, "SubID (Pata del Derivado)")
                .required()
                .options(vec![
                    FieldOption::new("10000", "10000 - Pata Larga (Asset)"),
                    FieldOption::new("20000", "20000 - Pata Corta (Liability)"),
                ]),
            factory::issue_country().fixed("[Deriv]"),
            FieldConfig::select(RISK_COUNTRY, "Risk_Country", "paises")
                .required()
                .fixed("[Deriv]"),
            factory::issue_currency().read_only(),
            factory::risk_currency().read_only(),
        ])
        .group(SectionGroup::new("main", &[SUB_ID]))
        .group(SectionGroup::new(
            "geography",
            &[ISSUE_COUNTRY, RISK_COUNTRY, ISSUE_CURRENCY, RISK_CURRENCY],
        ))
        .alert(SectionAlert::warning(
            "IMPORTANTE: SubID es obligatorio. 10000 = Pata Larga (Asset) | 20000 = Pata Corta (Liability)",
        ))
}
