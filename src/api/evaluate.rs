//! Stateless rule evaluation over HTTP.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AppState;
use crate::domain::fields::INVESTMENT_TYPE_CODE;
use crate::domain::{CompanyState, FieldUpdates, FieldValue, InstrumentRecord, Mode};
use crate::engine::cascade::type_change;
use crate::engine::step::missing_fields;
use crate::engine::{
    compute_cascade, validate, BatchContext, FormView, Resolver, StepPosition, ValidationReport,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub company_state: CompanyState,
    #[serde(default)]
    pub record: InstrumentRecord,
    /// Duplicate-value messages from an earlier check, keyed by field.
    #[serde(default)]
    pub duplicates: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub view: FormView,
    /// Fields still missing for the current step.
    pub missing: Vec<String>,
    pub validation: ValidationReport,
    pub can_save: bool,
}

pub async fn evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let config = state.ctx.registry.resolve(&req.record);
    let resolver = Resolver::new(config, &req.record, req.mode, req.company_state);

    let missing = match (resolver.step(), config) {
        (Some(StepPosition::Step(step)), Some(config)) => config
            .steps
            .iter()
            .find(|s| s.id == step)
            .map(|s| {
                missing_fields(s, &req.record)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let validation = validate(
        config,
        req.mode,
        &req.record,
        req.company_state,
        &req.duplicates,
    );
    let can_save = req.mode != Mode::Idle && !validation.has_blocking_errors();

    Ok(Json(EvaluateResponse {
        view: resolver.form_view(),
        missing,
        validation,
        can_save,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeRequest {
    pub field: String,
    #[serde(default)]
    pub value: Option<FieldValue>,
    #[serde(default)]
    pub record: InstrumentRecord,
    #[serde(default)]
    pub company_state: CompanyState,
    #[serde(default)]
    pub auto_populating: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResponse {
    pub updates: FieldUpdates,
    pub clear_company_state: bool,
    /// The record with the updates merged in.
    pub record: InstrumentRecord,
}

pub async fn cascade(
    State(state): State<AppState>,
    Json(req): Json<CascadeRequest>,
) -> Result<Json<CascadeResponse>, AppError> {
    let field = req.field.trim();
    if field.is_empty() {
        return Err(AppError::BadRequest("field is required".to_string()));
    }
    let value = req.value.unwrap_or_else(FieldValue::empty);
    let registry = &state.ctx.registry;

    let outcome = if field == INVESTMENT_TYPE_CODE {
        let incoming = registry.get_config(Some(&value));
        type_change(&value, incoming, &req.record, req.company_state)
    } else {
        let ctx = if req.auto_populating {
            BatchContext::auto_populate()
        } else {
            BatchContext::user()
        };
        compute_cascade(
            field,
            &value,
            registry.resolve(&req.record),
            req.company_state,
            ctx,
        )
    };

    let mut record = req.record;
    record.merge(&outcome.updates);
    Ok(Json(CascadeResponse {
        updates: outcome.updates,
        clear_company_state: outcome.clear_company_state,
        record,
    }))
}
