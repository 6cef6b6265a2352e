//! Field constructors shared by the asset type configurations.
//!
//! Each type still lists all of its fields; these helpers only keep labels,
//! catalogs and limits consistent between them.

use super::schema::{FieldConfig, FlowStep, SectionAlert, SectionConfig, SectionGroup};
use crate::domain::fields::*;
use crate::engine::condition::{Condition, ValueGate};

pub fn investment_type() -> FieldConfig {
    FieldConfig::select(INVESTMENT_TYPE_CODE, "Investment_Type_Code", "investmentTypes").required()
}

pub fn instrument_name() -> FieldConfig {
    FieldConfig::text(NAME_INSTRUMENTO, "Name_Instrumento")
        .required()
        .max_length(200)
}

pub fn public_data_source() -> FieldConfig {
    FieldConfig::select(PUBLIC_DATA_SOURCE, "Public_Data_Source", "dataSources")
        .required()
        .cascade(&[ISIN, TICKER_BBG, SEDOL, CUSIP], None)
}

pub fn isin() -> FieldConfig {
    FieldConfig::text(ISIN, "ISIN").max_length(12)
}

pub fn ticker_bbg() -> FieldConfig {
    FieldConfig::text(TICKER_BBG, "TickerBBG").max_length(50)
}

pub fn sedol() -> FieldConfig {
    FieldConfig::text(SEDOL, "SEDOL").max_length(7)
}

pub fn cusip() -> FieldConfig {
    FieldConfig::text(CUSIP, "CUSIP").max_length(9)
}

/// Type selector and instrument name, the first wizard step of every type.
pub fn step_one_group() -> SectionGroup {
    SectionGroup::new("step1", &[INVESTMENT_TYPE_CODE, NAME_INSTRUMENTO]).at_step(1)
}

/// Identifiers section for types that do not use a public data source:
/// all identifiers optional.
pub fn optional_identifiers_section(note: &str) -> SectionConfig {
    SectionConfig::new("identifiers", "Identificadores")
        .fields([investment_type(), instrument_name(), isin(), ticker_bbg(), sedol(), cusip()])
        .group(step_one_group())
        .group(SectionGroup::new("step2", &[ISIN, TICKER_BBG, SEDOL, CUSIP]).at_step(2))
        .hide(&[PUBLIC_DATA_SOURCE])
        .alert(SectionAlert::info(note))
}

pub fn company_name() -> FieldConfig {
    FieldConfig::company(COMPANY_NAME, "Nombre Compania").required()
}

pub fn issuer_type() -> FieldConfig {
    FieldConfig::select(ISSUER_TYPE_CODE, "Issuer_Type_Code", "issuerTypes").required()
}

pub fn sector_gics() -> FieldConfig {
    FieldConfig::select(SECTOR_GICS, "Sector_GICS", "sectoresGICS").required()
}

/// Company section pinned to constants, for types without a real issuer.
pub fn fixed_company_section(step: u32, name: &str, sector: &str) -> SectionConfig {
    SectionConfig::new("company", "Datos de la Compania")
        .at_step(step)
        .field(FieldConfig::text(COMPANY_NAME, "Nombre Compania").required().fixed(name))
        .field(issuer_type().fixed("0"))
        .field(sector_gics().fixed(sector))
}

pub fn editable_company_section(step: u32) -> SectionConfig {
    SectionConfig::new("company", "Datos de la Compania")
        .at_step(step)
        .fields([company_name(), issuer_type(), sector_gics()])
}

pub fn issue_country() -> FieldConfig {
    FieldConfig::select(ISSUE_COUNTRY, "Issue_Country", "paises").required()
}

pub fn risk_country() -> FieldConfig {
    FieldConfig::select(RISK_COUNTRY, "Risk_Country", "paises")
        .required()
        .cascade(
            &[SECTOR_CHILE_TYPE_CODE],
            Some(ValueGate::NotEquals("CL".to_string())),
        )
}

pub fn issue_currency() -> FieldConfig {
    FieldConfig::select(ISSUE_CURRENCY, "Issue_Currency", "monedas").required()
}

pub fn risk_currency() -> FieldConfig {
    FieldConfig::select(RISK_CURRENCY, "Risk_Currency", "monedas").required()
}

pub fn sector_chile() -> FieldConfig {
    FieldConfig::select(SECTOR_CHILE_TYPE_CODE, "Sector_Chile_Type_Code", "sectorChile")
        .visible_when(Condition::chilean_exposure())
        .required_when(Condition::chilean_exposure())
}

pub fn emision_nacional() -> FieldConfig {
    FieldConfig::select(EMISION_NACIONAL, "Emision_Nacional", "booleanValues")
        .visible_when(Condition::chilean_exposure())
        .required_when(Condition::chilean_exposure())
}

/// Geography for issuers with a real domicile.
pub fn geography_section(step: u32, include_emision_nacional: bool) -> SectionConfig {
    let mut section = SectionConfig::new("definition", "Definicion Geografica")
        .at_step(step)
        .fields([
            issue_country(),
            risk_country(),
            issue_currency(),
            risk_currency(),
            sector_chile(),
        ]);
    if include_emision_nacional {
        section = section.field(emision_nacional());
    }
    section
}

/// Geography pinned to a placeholder country, currencies copied from the queue item.
pub fn placeholder_geography_section(step: u32, country: &str) -> SectionConfig {
    SectionConfig::new("definition", "Definicion Geografica")
        .at_step(step)
        .fields([
            issue_country().fixed(country),
            FieldConfig::select(RISK_COUNTRY, "Risk_Country", "paises")
                .required()
                .fixed(country),
            issue_currency().read_only(),
            risk_currency().read_only(),
        ])
        .group(SectionGroup::new(
            "geography",
            &[ISSUE_COUNTRY, RISK_COUNTRY, ISSUE_CURRENCY, RISK_CURRENCY],
        ))
}

pub fn step_type_and_name() -> FlowStep {
    FlowStep::new(
        1,
        &[INVESTMENT_TYPE_CODE, NAME_INSTRUMENTO],
        "Paso 1: Seleccione el tipo de inversion y nombre del instrumento.",
    )
}

pub fn step_company(id: u32) -> FlowStep {
    FlowStep::new(
        id,
        &[COMPANY_NAME, ISSUER_TYPE_CODE, SECTOR_GICS],
        &format!("Paso {}: Ingrese los datos de la compania.", id),
    )
}

pub fn step_geography(id: u32) -> FlowStep {
    FlowStep::new(
        id,
        &[ISSUE_COUNTRY, RISK_COUNTRY, ISSUE_CURRENCY, RISK_CURRENCY],
        &format!("Paso {}: Complete los paises y monedas.", id),
    )
}

/// Geography step that also asks for the Chilean sector on Chilean exposure.
pub fn step_geography_with_chile(id: u32) -> FlowStep {
    step_geography(id).when(Condition::chilean_exposure(), &[SECTOR_CHILE_TYPE_CODE])
}

/// Fields meaningless for types without a public data source.
pub const NO_SOURCE_EXCLUSIONS: &[&str] = &[
    PUBLIC_DATA_SOURCE,
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
];
