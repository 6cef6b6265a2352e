//! Persisting a finished draft.

use super::session::{company_from_draft, EditSession, SessionError};
use crate::datasource::ServiceError;
use crate::domain::fields::*;
use crate::domain::{CompanyState, InstrumentRecord, Mode};
use crate::registry::{derivative, parse_type_id};
use serde::Serialize;
use tracing::{info, warn};

/// What a successful save did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub id_instrumento: String,
    /// True when a new record was created, false for an update.
    pub created: bool,
    pub company_created: bool,
    pub queue_completed: bool,
}

/// Payload sent to the instrument store for `draft`.
///
/// Session-only fields and blank flags are dropped. Instruments other than
/// derivatives without a sub id use the source currency as their sub id.
pub fn build_payload(draft: &InstrumentRecord) -> InstrumentRecord {
    let is_derivative =
        draft.get(INVESTMENT_TYPE_CODE).and_then(parse_type_id) == Some(derivative::ID);
    let mut payload: InstrumentRecord = draft
        .iter()
        .filter(|(name, _)| name.as_str() != QUEUE_ITEM_ID && name.as_str() != ES_INSTRUMENTO_NUEVO)
        .filter(|(name, value)| !(FLAG_FIELDS.contains(&name.as_str()) && value.is_empty()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    if !is_derivative && !payload.is_filled(SUB_ID) {
        if let Some(currency) = draft.get(MONEDA) {
            payload.set(SUB_ID, currency.clone());
        }
    }
    payload
}

impl EditSession {
    /// Validate, persist and complete the queue item.
    ///
    /// The draft is left untouched when validation or persistence fails, so
    /// the save can be retried.
    pub async fn save(&mut self) -> Result<SaveOutcome, SessionError> {
        if self.mode == Mode::Idle {
            return Err(SessionError::InvalidTransition {
                action: "save",
                mode: self.mode,
            });
        }
        let report = self.validate();
        if report.has_blocking_errors() {
            info!(
                session = %self.id,
                errors = report.errors().count(),
                "Save blocked by validation"
            );
            return Err(SessionError::Validation(report));
        }

        let payload = build_payload(&self.draft);
        let services = &self.ctx.services;

        let mut company_created = false;
        if self.company_state == CompanyState::New {
            match services.companies.create(&company_from_draft(&self.draft)).await {
                Ok(_) => company_created = true,
                Err(ServiceError::Conflict(name)) => {
                    warn!(session = %self.id, company = %name, "Company already exists, continuing");
                }
                Err(e) => {
                    warn!(session = %self.id, error = %e, "Company creation failed, continuing");
                }
            }
        }

        let id = self.draft.text(ID_INSTRUMENTO);
        let created = !self.mode.updates_existing();
        let stored = if created {
            services.store.create(&payload).await
        } else {
            services.store.update(&id, &payload).await
        };
        if let Err(e) = stored {
            warn!(session = %self.id, id = %id, error = %e, "Instrument save failed");
            return Err(SessionError::Persistence(e));
        }
        if company_created {
            self.company_state = CompanyState::Selected;
        }
        self.ctx.catalogs.invalidate_instruments();

        let mut queue_completed = false;
        if self.draft.is_filled(QUEUE_ITEM_ID) {
            let item = self.draft.text(QUEUE_ITEM_ID);
            match services.queue.mark_completed(&item).await {
                Ok(()) => queue_completed = true,
                Err(e) => {
                    warn!(session = %self.id, queue_item = %item, error = %e, "Failed to complete queue item");
                }
            }
        }

        info!(
            session = %self.id,
            id = %id,
            mode = %self.mode,
            created,
            queue_completed,
            "Instrument saved"
        );
        Ok(SaveOutcome {
            id_instrumento: id,
            created,
            company_created,
            queue_completed,
        })
    }
}
