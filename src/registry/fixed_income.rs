//! Fixed Income (type 1): Bloomberg-sourced bonds require an ISIN and carry
//! coupon and yield parameters.

use super::factory;
use super::schema::{
    AssetTypeConfig, FieldConfig, FlowStep, SectionAlert, SectionConfig, SectionGroup,
    TypeValidation, ValidationRule,
};
use crate::domain::fields::*;
use crate::engine::condition::{Condition, ValueGate};

pub const ID: u32 = 1;

pub fn config() -> AssetTypeConfig {
    AssetTypeConfig::new(ID, "Fixed Income (Renta Fija)")
        .section(identifiers())
        .section(factory::editable_company_section(3))
        .section(factory::geography_section(4, true))
        .section(parameters())
        .step(factory::step_type_and_name())
        .step(
            FlowStep::new(
                2,
                &[PUBLIC_DATA_SOURCE],
                "Paso 2: Seleccione la fuente de datos y complete ISIN.",
            )
            .when(Condition::bloomberg_source(), &[ISIN]),
        )
        .step(factory::step_company(3))
        .step(factory::step_geography_with_chile(4))
        .step(
            FlowStep::new(
                5,
                &[COUPON_TYPE_CODE, YIELD_TYPE, YIELD_SOURCE, PERPETUIDAD, RENDIMIENTO],
                "Paso 5: Complete los parametros de renta fija.",
            )
            .when(
                Condition::not_equals(COUPON_TYPE_CODE, "ZERO"),
                &[COUPON_FREQUENCY],
            )
            .when(yield_source_bloomberg(), &[COCO, CALLABLE, SINKABLE]),
        )
        .validation(TypeValidation::error(
            "bbgRequiresISIN",
            ValidationRule::BloombergRequires {
                field: ISIN.to_string(),
            },
            "ISIN es OBLIGATORIO para Bloomberg + Fixed Income",
        ))
        .exclude(&[SUB_ID, CASH_TYPE_CODE, BANK_DEBT_TYPE_CODE, FUND_TYPE_CODE])
}

/// Yield source set to the literal Bloomberg code.
fn yield_source_bloomberg() -> Condition {
    Condition::equals(YIELD_SOURCE, "BBG")
}

fn identifiers() -> SectionConfig {
    SectionConfig::new("identifiers", "Identificadores")
        .fields([
            factory::investment_type(),
            factory::instrument_name(),
            factory::public_data_source(),
            factory::isin()
                .required_when(Condition::bloomberg_source())
                .priority(),
            factory::ticker_bbg(),
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
            SectionAlert::info("Para Bloomberg + Fixed Income: ISIN es OBLIGATORIO")
                .when(Condition::bloomberg_source()),
        )
}

fn parameters() -> SectionConfig {
    SectionConfig::new("parameters", "Parametros Renta Fija")
        .at_step(5)
        .fields([
            FieldConfig::select(COUPON_TYPE_CODE, "Coupon_Type_Code", "couponTypes")
                .required()
                .cascade(&[COUPON_FREQUENCY], Some(ValueGate::Equals("ZERO".to_string()))),
            FieldConfig::select(YIELD_TYPE, "Yield_Type", "yieldTypes").required(),
            FieldConfig::select(YIELD_SOURCE, "Yield_Source", "yieldSources")
                .required()
                .cascade(BBG_FIELDS, Some(ValueGate::NotEquals("BBG".to_string()))),
            FieldConfig::select(PERPETUIDAD, "Perpetuidad", "booleanValues").required(),
            FieldConfig::select(RENDIMIENTO, "Rendimiento", "booleanValues").required(),
            FieldConfig::select(COUPON_FREQUENCY, "Coupon_Frequency", "couponFrequencies")
                .required()
                .visible_when(Condition::not_equals(COUPON_TYPE_CODE, "ZERO")),
            FieldConfig::select(COCO, "CoCo", "booleanValues")
                .visible_when(yield_source_bloomberg())
                .required_when(yield_source_bloomberg()),
            FieldConfig::select(CALLABLE, "Callable", "booleanValues")
                .visible_when(yield_source_bloomberg())
                .required_when(yield_source_bloomberg()),
            FieldConfig::select(SINKABLE, "Sinkable", "booleanValues")
                .visible_when(yield_source_bloomberg())
                .required_when(yield_source_bloomberg()),
            FieldConfig::number(YAS_YLD_FLAG, "YAS_YLD_FLAG").visible_when(yield_source_bloomberg()),
        ])
        .group(SectionGroup::new(
            "main",
            &[COUPON_TYPE_CODE, YIELD_TYPE, YIELD_SOURCE, PERPETUIDAD, RENDIMIENTO, COUPON_FREQUENCY],
        ))
        .group(SectionGroup::new("bbgFields", BBG_FIELDS).visible_when(yield_source_bloomberg()))
        .alert(
            SectionAlert::info("Yield Source = BBG: Complete los campos adicionales de Bloomberg.")
                .when(yield_source_bloomberg()),
        )
}
