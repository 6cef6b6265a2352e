//! Equity (type 2): Bloomberg-sourced shares require a ticker.

use super::factory;
use super::schema::{
    AssetTypeConfig, FlowStep, SectionAlert, SectionConfig, SectionGroup, TypeValidation,
    ValidationRule,
};
use crate::domain::fields::*;
use crate::engine::condition::Condition;

pub const ID: u32 = 2;

pub fn config() -> AssetTypeConfig {
    AssetTypeConfig::new(ID, "Equity (Renta Variable)")
        .section(identifiers())
        .section(factory::editable_company_section(3))
        .section(factory::geography_section(4, false))
        .step(factory::step_type_and_name())
        .step(
            FlowStep::new(
                2,
                &[PUBLIC_DATA_SOURCE],
                "Paso 2: Seleccione la fuente de datos y complete TickerBBG.",
            )
            .when(Condition::bloomberg_source(), &[TICKER_BBG]),
        )
        .step(factory::step_company(3))
        .step(factory::step_geography_with_chile(4))
        .validation(TypeValidation::error(
            "bbgRequiresTickerBBG",
            ValidationRule::BloombergRequires {
                field: TICKER_BBG.to_string(),
            },
            "TickerBBG es OBLIGATORIO para Bloomberg + Equity",
        ))
        .validation(TypeValidation::warning(
            "atLeastOneIdentifier",
            ValidationRule::AtLeastOneIdentifier,
            "Se recomienda ingresar al menos un identificador (ISIN, TickerBBG, SEDOL o CUSIP)",
        ))
        .exclude(&[
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
            SUB_ID,
            CASH_TYPE_CODE,
            BANK_DEBT_TYPE_CODE,
            FUND_TYPE_CODE,
        ])
}

fn identifiers() -> SectionConfig {
    SectionConfig::new("identifiers", "Identificadores")
        .fields([
            factory::investment_type(),
            factory::instrument_name(),
            factory::public_data_source(),
            factory::isin(),
            factory::ticker_bbg()
                .required_when(Condition::bloomberg_source())
                .priority(),
            factory::sedol(),
            factory::cusip(),
        ])
        .group(factory::step_one_group())
        .group(
            SectionGroup::new("step2", &[PUBLIC_DATA_SOURCE, ISIN, TICKER_BBG, SEDOL, CUSIP])
                .at_step(2)
                .visible_when(Condition::fields_complete(&[
                    INVESTMENT_TYPE_CODE,
                    NAME_INSTRUMENTO,
                ])),
        )
        .alert(
            SectionAlert::info("Para Bloomberg + Equity: TickerBBG es OBLIGATORIO")
                .when(Condition::bloomberg_source()),
        )
}
