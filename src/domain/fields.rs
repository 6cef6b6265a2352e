//! Canonical field names and the field families the engine reasons about.

pub const INVESTMENT_TYPE_CODE: &str = "investmentTypeCode";
pub const NAME_INSTRUMENTO: &str = "nameInstrumento";
pub const PUBLIC_DATA_SOURCE: &str = "publicDataSource";
pub const ISIN: &str = "isin";
pub const TICKER_BBG: &str = "tickerBBG";
pub const SEDOL: &str = "sedol";
pub const CUSIP: &str = "cusip";
pub const COMPANY_NAME: &str = "companyName";
pub const ISSUER_TYPE_CODE: &str = "issuerTypeCode";
pub const SECTOR_GICS: &str = "sectorGICS";
pub const ISSUE_COUNTRY: &str = "issueCountry";
pub const RISK_COUNTRY: &str = "riskCountry";
pub const SECTOR_CHILE_TYPE_CODE: &str = "sectorChileTypeCode";
pub const ISSUE_CURRENCY: &str = "issueCurrency";
pub const RISK_CURRENCY: &str = "riskCurrency";
pub const EMISION_NACIONAL: &str = "emisionNacional";
pub const COUPON_TYPE_CODE: &str = "couponTypeCode";
pub const YIELD_TYPE: &str = "yieldType";
pub const YIELD_SOURCE: &str = "yieldSource";
pub const PERPETUIDAD: &str = "perpetuidad";
pub const RENDIMIENTO: &str = "rendimiento";
pub const COUPON_FREQUENCY: &str = "couponFrequency";
pub const COCO: &str = "coco";
pub const CALLABLE: &str = "callable";
pub const SINKABLE: &str = "sinkable";
pub const YAS_YLD_FLAG: &str = "yasYldFlag";
pub const SUB_ID: &str = "subId";
pub const CASH_TYPE_CODE: &str = "cashTypeCode";
pub const BANK_DEBT_TYPE_CODE: &str = "bankDebtTypeCode";
pub const FUND_TYPE_CODE: &str = "fundTypeCode";
pub const ISSUE_TYPE_CODE: &str = "issueTypeCode";
pub const RANK_CODE: &str = "rankCode";
pub const COMENTARIOS: &str = "comentarios";

pub const ID_INSTRUMENTO: &str = "idInstrumento";
pub const MONEDA: &str = "moneda";
pub const FUENTE: &str = "fuente";
pub const NOMBRE_FUENTE: &str = "nombreFuente";
pub const QUEUE_ITEM_ID: &str = "queueItemId";
pub const ES_INSTRUMENTO_NUEVO: &str = "esInstrumentoNuevo";
pub const ES_REESTRUCTURACION: &str = "esReestructuracion";
pub const ID_PREDECESOR: &str = "idPredecesor";
pub const MONEDA_PREDECESOR: &str = "monedaPredecesor";
pub const TIPO_CONTINUADOR: &str = "tipoContinuador";
pub const DIA_VALIDEZ: &str = "diaValidez";
pub const MAIN: &str = "main";

pub const COMPANY_FIELDS: &[&str] = &[COMPANY_NAME, ISSUER_TYPE_CODE, SECTOR_GICS];

pub const IDENTIFIER_FIELDS: &[&str] = &[PUBLIC_DATA_SOURCE, ISIN, TICKER_BBG, SEDOL, CUSIP];

/// Identifiers that count towards "at least one identifier".
pub const SECURITY_IDENTIFIERS: &[&str] = &[ISIN, TICKER_BBG, SEDOL, CUSIP];

pub const GEOGRAPHY_FIELDS: &[&str] = &[
    ISSUE_COUNTRY,
    RISK_COUNTRY,
    SECTOR_CHILE_TYPE_CODE,
    ISSUE_CURRENCY,
    RISK_CURRENCY,
    EMISION_NACIONAL,
];

pub const FI_PARAMETER_FIELDS: &[&str] = &[
    COUPON_TYPE_CODE,
    YIELD_TYPE,
    YIELD_SOURCE,
    PERPETUIDAD,
    RENDIMIENTO,
    COUPON_FREQUENCY,
];

pub const BBG_FIELDS: &[&str] = &[COCO, CALLABLE, SINKABLE, YAS_YLD_FLAG];

pub const CURRENCY_FIELDS: &[&str] = &[ISSUE_CURRENCY, RISK_CURRENCY];

/// Per-type parameter selectors outside the FI family.
pub const TYPE_PARAMETER_FIELDS: &[&str] = &[
    ISSUE_TYPE_CODE,
    RANK_CODE,
    CASH_TYPE_CODE,
    BANK_DEBT_TYPE_CODE,
    FUND_TYPE_CODE,
];

/// Fields copied from the work queue item; never editable.
pub const SOURCE_FIELDS: &[&str] = &[NOMBRE_FUENTE, FUENTE, MONEDA, QUEUE_ITEM_ID];

pub const RESTRUCTURING_FIELDS: &[&str] = &[ID_PREDECESOR, MONEDA_PREDECESOR, MAIN, DIA_VALIDEZ];

/// Fields a confirmed match copies from an existing record.
pub const INHERITABLE_FIELDS: &[&str] = &[
    NAME_INSTRUMENTO,
    PUBLIC_DATA_SOURCE,
    ISIN,
    TICKER_BBG,
    SEDOL,
    CUSIP,
    COMPANY_NAME,
    ISSUER_TYPE_CODE,
    SECTOR_GICS,
    INVESTMENT_TYPE_CODE,
    ISSUE_TYPE_CODE,
    SECTOR_CHILE_TYPE_CODE,
    ISSUE_COUNTRY,
    RISK_COUNTRY,
    ISSUE_CURRENCY,
    RISK_CURRENCY,
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
    RANK_CODE,
    CASH_TYPE_CODE,
    BANK_DEBT_TYPE_CODE,
    FUND_TYPE_CODE,
    TIPO_CONTINUADOR,
    DIA_VALIDEZ,
    COMENTARIOS,
];

/// Never inherited from a predecessor, whatever the type.
pub const RESTRUCTURING_BASE_EXCLUSIONS: &[&str] = &[
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
    TIPO_CONTINUADOR,
    DIA_VALIDEZ,
    COMENTARIOS,
];

/// Single-character flag columns; blank values are dropped before saving.
pub const FLAG_FIELDS: &[&str] = &[
    ES_REESTRUCTURACION,
    EMISION_NACIONAL,
    PERPETUIDAD,
    RENDIMIENTO,
    COCO,
    CALLABLE,
    SINKABLE,
];

/// Fields checked against existing records for duplicates.
pub const DUPLICATE_CHECK_FIELDS: &[&str] = &[NAME_INSTRUMENTO, ISIN, TICKER_BBG, SEDOL, CUSIP];

/// Everything downstream of the type selector.
pub fn all_dependent_fields() -> Vec<&'static str> {
    COMPANY_FIELDS
        .iter()
        .chain(IDENTIFIER_FIELDS)
        .chain(GEOGRAPHY_FIELDS)
        .chain(FI_PARAMETER_FIELDS)
        .chain(BBG_FIELDS)
        .chain(TYPE_PARAMETER_FIELDS)
        .chain(std::iter::once(&SUB_ID))
        .chain(std::iter::once(&COMENTARIOS))
        .copied()
        .collect()
}

/// Data-source encodings recognized as Bloomberg.
pub const BLOOMBERG_SYNONYMS: &[&str] = &["bbg", "bloomberg", "3", "14"];
