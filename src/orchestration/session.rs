//! Editing session for one instrument draft.
//!
//! A session owns the draft, the active [`Mode`] and the company state. Every
//! operation takes `&mut self` and merges its writes in one step, so callers
//! never observe a half-applied cascade or transition.

use super::cache::CatalogStore;
use super::debounce::MountGuard;
use super::lookups::{find_duplicate, LookupSettings, Lookups};
use crate::datasource::{ServiceError, Services};
use crate::domain::fields::*;
use crate::domain::{
    CatalogEntry, Company, CompanyState, FieldUpdates, FieldValue, InstrumentRecord, Mode,
};
use crate::engine::cascade::{populate_from_company, type_change, type_defaults};
use crate::engine::inheritance::{
    inherit_all, inherit_for_restructuring, inherit_without_currencies,
};
use crate::engine::{
    compute_cascade, validate, BatchContext, CascadeOutcome, FormView, Resolver, StepPosition,
    ValidationReport,
};
use crate::registry::{AssetTypeConfig, Registry};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Field {field} is read-only in {mode} mode")]
    ReadOnly { field: String, mode: Mode },
    #[error("Cannot {action} in {mode} mode")]
    InvalidTransition { action: &'static str, mode: Mode },
    #[error("No existe instrumento con id {id} y moneda {currency}")]
    PredecessorNotFound { id: String, currency: String },
    #[error("Validation failed with {} blocking errors", .0.errors().count())]
    Validation(ValidationReport),
    #[error("Failed to persist instrument: {0}")]
    Persistence(ServiceError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Shared pieces every session of one process uses.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub registry: Arc<Registry>,
    pub services: Services,
    pub catalogs: Arc<CatalogStore>,
    pub lookups: LookupSettings,
}

impl SessionContext {
    pub fn new(
        registry: Arc<Registry>,
        services: Services,
        catalog_ttl: Duration,
        lookups: LookupSettings,
    ) -> Self {
        let catalogs = Arc::new(CatalogStore::new(
            services.catalogs.clone(),
            services.instruments.clone(),
            catalog_ttl,
        ));
        Self {
            registry,
            services,
            catalogs,
            lookups,
        }
    }

    /// Open a session on a draft seeded from a work queue item.
    pub fn open(&self, seed: InstrumentRecord) -> EditSession {
        EditSession::new(self.clone(), seed)
    }
}

/// Existing record found for the draft's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingMatch {
    /// [`Mode::Exact`] when the currency matches too, else [`Mode::Partial`].
    pub mode: Mode,
    pub record: InstrumentRecord,
}

#[derive(Debug)]
pub struct EditSession {
    pub(super) id: Uuid,
    pub(super) ctx: SessionContext,
    pub(super) draft: InstrumentRecord,
    pub(super) mode: Mode,
    pub(super) company_state: CompanyState,
    selected_company: Option<Company>,
    duplicates: BTreeMap<String, String>,
    predecessor_error: Option<String>,
    mount: MountGuard,
    lookups: Lookups,
}

impl EditSession {
    pub fn new(ctx: SessionContext, seed: InstrumentRecord) -> Self {
        let mount = MountGuard::new();
        let lookups = Lookups::new(ctx.services.clone(), ctx.lookups, mount.clone());
        let id = Uuid::new_v4();
        debug!(session = %id, queue_item = %seed.text(QUEUE_ITEM_ID), "Session opened");
        Self {
            id,
            ctx,
            draft: seed,
            mode: Mode::Idle,
            company_state: CompanyState::Writing,
            selected_company: None,
            duplicates: BTreeMap::new(),
            predecessor_error: None,
            mount,
            lookups,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn draft(&self) -> &InstrumentRecord {
        &self.draft
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn company_state(&self) -> CompanyState {
        self.company_state
    }

    pub fn selected_company(&self) -> Option<&Company> {
        self.selected_company.as_ref()
    }

    /// Duplicate-value messages keyed by field.
    pub fn duplicate_errors(&self) -> &BTreeMap<String, String> {
        &self.duplicates
    }

    /// Inline error from the last failed predecessor lookup.
    pub fn predecessor_error(&self) -> Option<&str> {
        self.predecessor_error.as_deref()
    }

    /// Handle for debounced lookups. Results must be fed back through the
    /// matching `apply_*` method.
    pub fn lookups(&self) -> &Lookups {
        &self.lookups
    }

    pub fn is_open(&self) -> bool {
        self.mount.is_mounted()
    }

    /// Close the session. Lookups still pending resolve to `None`.
    pub fn close(self) {}

    /// Configuration of the type selected on the draft.
    pub fn config(&self) -> Option<&AssetTypeConfig> {
        self.ctx.registry.resolve(&self.draft)
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.config(), &self.draft, self.mode, self.company_state)
    }

    pub fn view(&self) -> FormView {
        self.resolver().form_view()
    }

    pub fn current_step(&self) -> Option<StepPosition> {
        self.resolver().step()
    }

    pub fn validate(&self) -> ValidationReport {
        validate(
            self.config(),
            self.mode,
            &self.draft,
            self.company_state,
            &self.duplicates,
        )
    }

    fn reset_company(&mut self) {
        self.company_state = CompanyState::Writing;
        self.selected_company = None;
    }

    fn forget_duplicates(&mut self, updates: &FieldUpdates) {
        self.duplicates.retain(|field, _| !updates.contains_key(field));
    }

    /// Apply one user edit with its cascade.
    ///
    /// Setting the type selector on a draft without an id starts a new
    /// instrument first. The two mode flags route to their transitions.
    pub async fn apply_change(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<FieldUpdates, SessionError> {
        let value = value.into();
        if self.resolver().is_field_read_only(field) {
            return Err(SessionError::ReadOnly {
                field: field.to_string(),
                mode: self.mode,
            });
        }

        match field {
            ES_REESTRUCTURACION => {
                self.toggle_restructuring(value.is_truthy()).await?;
                return Ok(FieldUpdates::new());
            }
            ES_INSTRUMENTO_NUEVO => {
                if value.is_truthy() {
                    self.activate_new().await?;
                } else {
                    self.deactivate_new();
                }
                return Ok(FieldUpdates::new());
            }
            INVESTMENT_TYPE_CODE
                if self.mode == Mode::Idle
                    && !self.draft.is_filled(ID_INSTRUMENTO)
                    && !value.is_empty() =>
            {
                self.activate_new().await?;
            }
            _ => {}
        }

        let keeps_selection = field == COMPANY_NAME
            && self
                .selected_company
                .as_ref()
                .is_some_and(|c| c.matches_name(&value.as_loose_string()));

        let mut outcome = if field == INVESTMENT_TYPE_CODE {
            let incoming = self.ctx.registry.get_config(Some(&value));
            type_change(&value, incoming, &self.draft, self.company_state)
        } else if keeps_selection {
            let mut outcome = CascadeOutcome::default();
            outcome.updates.insert(field.to_string(), value);
            outcome
        } else {
            compute_cascade(
                field,
                &value,
                self.config(),
                self.company_state,
                BatchContext::user(),
            )
        };

        self.refill_defaults(&mut outcome.updates);
        self.draft.merge(&outcome.updates);
        self.forget_duplicates(&outcome.updates);
        if outcome.clear_company_state || (field == COMPANY_NAME && !keeps_selection) {
            self.reset_company();
        }
        debug!(
            session = %self.id,
            field,
            writes = outcome.updates.len(),
            "Applied change"
        );
        Ok(outcome.updates)
    }

    /// Fixed and auto-populated fields refill wherever `updates` would leave
    /// them empty.
    fn refill_defaults(&self, updates: &mut FieldUpdates) {
        let mut projected = self.draft.clone();
        projected.merge(updates);
        if let Some(config) = self.ctx.registry.resolve(&projected) {
            updates.extend(type_defaults(config, &projected));
        }
    }

    /// Start a brand-new instrument with a freshly allocated id.
    pub async fn activate_new(&mut self) -> Result<(), SessionError> {
        match self.mode {
            Mode::New => return Ok(()),
            Mode::Idle => {}
            mode => {
                return Err(SessionError::InvalidTransition {
                    action: "activate a new instrument",
                    mode,
                })
            }
        }
        let id = self.ctx.services.instruments.next_id().await?;

        let mut updates: FieldUpdates = all_dependent_fields()
            .into_iter()
            .map(|name| (name.to_string(), FieldValue::empty()))
            .collect();
        updates.insert(ID_INSTRUMENTO.to_string(), FieldValue::from(id));
        updates.insert(ES_INSTRUMENTO_NUEVO.to_string(), FieldValue::Bool(true));
        self.draft.merge(&updates);
        self.mode = Mode::New;
        self.reset_company();
        self.duplicates.clear();
        info!(session = %self.id, id, "New instrument activated");
        Ok(())
    }

    /// Drop everything but the source fields and return to idle.
    pub fn deactivate_new(&mut self) {
        let mut draft = InstrumentRecord::new();
        for &name in SOURCE_FIELDS {
            if let Some(value) = self.draft.get(name) {
                draft.set(name, value.clone());
            }
        }
        self.draft = draft;
        let from = std::mem::replace(&mut self.mode, Mode::Idle);
        self.reset_company();
        self.duplicates.clear();
        self.predecessor_error = None;
        info!(session = %self.id, from = %from, "Draft reset to idle");
    }

    /// Find an existing record for `id` in the instrument universe.
    pub async fn match_existing(&self, id: &str) -> Result<Option<ExistingMatch>, SessionError> {
        let universe = self.ctx.catalogs.all_instruments().await?;
        let currency = self.draft.text(MONEDA);
        let same_id = |r: &&InstrumentRecord| r.text(ID_INSTRUMENTO) == id.trim();

        if let Some(record) = universe
            .iter()
            .filter(same_id)
            .find(|r| r.text(MONEDA) == currency)
        {
            return Ok(Some(ExistingMatch {
                mode: Mode::Exact,
                record: record.clone(),
            }));
        }
        Ok(universe.iter().find(same_id).map(|record| ExistingMatch {
            mode: Mode::Partial,
            record: record.clone(),
        }))
    }

    /// Identifier and currency match `record`: inherit everything.
    pub fn confirm_exact(&mut self, record: &InstrumentRecord) -> Result<(), SessionError> {
        self.confirm_match(Mode::Exact, record, inherit_all(record))
    }

    /// Identifier matches `record` in another currency: inherit all but the
    /// currencies.
    pub fn confirm_partial(&mut self, record: &InstrumentRecord) -> Result<(), SessionError> {
        self.confirm_match(Mode::Partial, record, inherit_without_currencies(record))
    }

    fn confirm_match(
        &mut self,
        mode: Mode,
        record: &InstrumentRecord,
        inherited: FieldUpdates,
    ) -> Result<(), SessionError> {
        if self.mode == Mode::Restructuring {
            return Err(SessionError::InvalidTransition {
                action: "confirm a match",
                mode: self.mode,
            });
        }
        let mut updates: FieldUpdates = INHERITABLE_FIELDS
            .iter()
            .copied()
            .chain(all_dependent_fields())
            .chain([ES_INSTRUMENTO_NUEVO, ES_REESTRUCTURACION])
            .map(|name| (name.to_string(), FieldValue::empty()))
            .collect();
        updates.extend(inherited);
        updates.insert(
            ID_INSTRUMENTO.to_string(),
            record
                .get(ID_INSTRUMENTO)
                .cloned()
                .unwrap_or_else(FieldValue::empty),
        );
        self.refill_defaults(&mut updates);

        self.draft.merge(&updates);
        self.mode = mode;
        self.adopt_inherited_company();
        self.duplicates.clear();
        info!(
            session = %self.id,
            mode = %mode,
            id = %record.text(ID_INSTRUMENTO),
            "Match confirmed"
        );
        Ok(())
    }

    /// An inherited company already exists, so it counts as selected.
    fn adopt_inherited_company(&mut self) {
        if self.draft.is_filled(COMPANY_NAME) {
            self.company_state = CompanyState::Selected;
            self.selected_company = Some(company_from_draft(&self.draft));
        } else {
            self.reset_company();
        }
    }

    /// Enter or leave restructuring.
    pub async fn toggle_restructuring(&mut self, on: bool) -> Result<(), SessionError> {
        if !on {
            if self.mode != Mode::Restructuring {
                return Ok(());
            }
            let updates: FieldUpdates = RESTRUCTURING_FIELDS
                .iter()
                .chain([&ES_REESTRUCTURACION])
                .map(|name| (name.to_string(), FieldValue::empty()))
                .collect();
            self.draft.merge(&updates);
            self.mode = Mode::New;
            self.predecessor_error = None;
            info!(session = %self.id, "Left restructuring");
            return Ok(());
        }

        match self.mode {
            Mode::Restructuring => return Ok(()),
            Mode::Exact => {
                return Err(SessionError::InvalidTransition {
                    action: "enter restructuring",
                    mode: self.mode,
                })
            }
            _ => {}
        }
        let id = self.ctx.services.instruments.next_id().await?;

        let mut updates = FieldUpdates::new();
        updates.insert(ID_INSTRUMENTO.to_string(), FieldValue::from(id));
        updates.insert(ES_REESTRUCTURACION.to_string(), FieldValue::text("S"));
        updates.insert(ID_PREDECESOR.to_string(), FieldValue::empty());
        updates.insert(MONEDA_PREDECESOR.to_string(), FieldValue::empty());
        self.draft.merge(&updates);
        self.mode = Mode::Restructuring;
        self.predecessor_error = None;
        info!(session = %self.id, id, "Entered restructuring");
        Ok(())
    }

    /// Fetch the predecessor and inherit from it.
    pub async fn resolve_predecessor(&mut self, id: &str, currency: &str) -> Result<(), SessionError> {
        self.require_restructuring()?;
        let found = self
            .ctx
            .services
            .instruments
            .get_by_id_and_currency(id, currency)
            .await?;
        self.apply_predecessor(id, currency, found)
    }

    fn require_restructuring(&self) -> Result<(), SessionError> {
        if self.mode == Mode::Restructuring {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action: "resolve a predecessor",
                mode: self.mode,
            })
        }
    }

    /// Apply a predecessor lookup result. A missing predecessor leaves the
    /// draft untouched apart from clearing the predecessor key.
    pub fn apply_predecessor(
        &mut self,
        id: &str,
        currency: &str,
        found: Option<InstrumentRecord>,
    ) -> Result<(), SessionError> {
        self.require_restructuring()?;
        let Some(predecessor) = found else {
            self.draft.set(ID_PREDECESOR, FieldValue::empty());
            self.draft.set(MONEDA_PREDECESOR, FieldValue::empty());
            let err = SessionError::PredecessorNotFound {
                id: id.to_string(),
                currency: currency.to_string(),
            };
            warn!(session = %self.id, id, currency, "Predecessor not found");
            self.predecessor_error = Some(err.to_string());
            return Err(err);
        };

        let config = self
            .ctx
            .registry
            .resolve(&predecessor)
            .or_else(|| self.config());
        // Fields the predecessor lacks must not keep what the draft held.
        let mut updates: FieldUpdates = INHERITABLE_FIELDS
            .iter()
            .map(|name| (name.to_string(), FieldValue::empty()))
            .collect();
        updates.extend(inherit_for_restructuring(&predecessor, config));
        updates.insert(ID_PREDECESOR.to_string(), FieldValue::text(id.trim()));
        updates.insert(MONEDA_PREDECESOR.to_string(), FieldValue::text(currency.trim()));
        self.refill_defaults(&mut updates);

        self.draft.merge(&updates);
        self.adopt_inherited_company();
        self.predecessor_error = None;
        info!(session = %self.id, id, currency, "Predecessor resolved");
        Ok(())
    }

    /// Copy a matched company onto the draft and lock its issuer and sector.
    pub fn select_company(&mut self, company: Company) -> Result<FieldUpdates, SessionError> {
        if self.resolver().is_field_read_only(COMPANY_NAME) {
            return Err(SessionError::ReadOnly {
                field: COMPANY_NAME.to_string(),
                mode: self.mode,
            });
        }
        Ok(self.adopt_company(company))
    }

    fn adopt_company(&mut self, company: Company) -> FieldUpdates {
        let updates = populate_from_company(&company, self.config());
        self.draft.merge(&updates);
        self.company_state = CompanyState::Selected;
        debug!(session = %self.id, company = %company.company_name, "Company selected");
        self.selected_company = Some(company);
        updates
    }

    /// Resolve the typed company name to `selected` or `new`.
    pub async fn check_exact_company(&mut self, name: &str) -> Result<CompanyState, SessionError> {
        let found = self.ctx.services.companies.get_exact(name.trim()).await?;
        Ok(self.apply_exact_company(name, found))
    }

    /// Apply an exact-company lookup for `name`. Results for a name the
    /// draft no longer holds are ignored.
    pub fn apply_exact_company(&mut self, name: &str, found: Option<Company>) -> CompanyState {
        let current = self.draft.text(COMPANY_NAME);
        if current.is_empty() || !current.eq_ignore_ascii_case(name.trim()) {
            return self.company_state;
        }
        match found {
            Some(company) => {
                self.adopt_company(company);
            }
            None => {
                self.company_state = CompanyState::New;
                self.selected_company = None;
            }
        }
        self.company_state
    }

    /// Re-check every duplicate-sensitive field against existing records.
    pub async fn refresh_duplicates(&mut self) -> Result<(), SessionError> {
        let exclude = self
            .draft
            .is_filled(ID_INSTRUMENTO)
            .then(|| self.draft.text(ID_INSTRUMENTO));
        let values: Vec<(&str, String)> = DUPLICATE_CHECK_FIELDS
            .iter()
            .map(|&field| (field, self.draft.text(field)))
            .collect();
        let exclude = exclude.as_deref();
        let instruments = self.ctx.services.instruments.as_ref();
        let checks = values.iter().map(|(field, value)| async move {
            find_duplicate(instruments, field, value, exclude)
                .await
                .map(|message| message.map(|m| (field.to_string(), m)))
        });
        let found = try_join_all(checks).await?;
        self.duplicates = found.into_iter().flatten().collect();
        Ok(())
    }

    /// Apply one debounced duplicate check result.
    pub fn apply_duplicate(&mut self, field: &str, message: Option<String>) {
        match message {
            Some(message) => {
                self.duplicates.insert(field.to_string(), message);
            }
            None => {
                self.duplicates.remove(field);
            }
        }
    }

    /// Choices for a select field: its fixed options, else the active
    /// entries of its catalog.
    pub async fn field_options(&self, field: &str) -> Result<Vec<CatalogEntry>, SessionError> {
        let Some((_, config)) = self.config().and_then(|c| c.find_field(field)) else {
            return Ok(Vec::new());
        };
        if !config.options.is_empty() {
            return Ok(config
                .options
                .iter()
                .map(|o| CatalogEntry::new(o.value.clone(), o.label.clone()))
                .collect());
        }
        match &config.options_key {
            Some(key) => Ok(self.ctx.catalogs.options(key).await?),
            None => Ok(Vec::new()),
        }
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        self.mount.unmount();
    }
}

/// The company as currently written on the draft.
pub(super) fn company_from_draft(draft: &InstrumentRecord) -> Company {
    let mut company = Company::new(draft.text(COMPANY_NAME));
    if draft.is_filled(ISSUER_TYPE_CODE) {
        company = company.with_issuer_type(draft.text(ISSUER_TYPE_CODE));
    }
    if draft.is_filled(SECTOR_GICS) {
        company = company.with_sector(draft.text(SECTOR_GICS));
    }
    company
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockBackend;

    fn context(backend: MockBackend) -> (SessionContext, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        let ctx = SessionContext::new(
            Arc::new(Registry::builtin().clone()),
            Services::from_backend(backend.clone()),
            Duration::from_secs(300),
            LookupSettings::default(),
        );
        (ctx, backend)
    }

    fn seed() -> InstrumentRecord {
        InstrumentRecord::new()
            .with(QUEUE_ITEM_ID, "q-1")
            .with(MONEDA, "1")
            .with(FUENTE, "BLOOMBERG")
            .with(NOMBRE_FUENTE, "APPLE 4.5 2030")
    }

    fn existing() -> InstrumentRecord {
        InstrumentRecord::new()
            .with(ID_INSTRUMENTO, 101)
            .with(MONEDA, "1")
            .with(NAME_INSTRUMENTO, "APPLE 2030")
            .with(INVESTMENT_TYPE_CODE, "1")
            .with(ISIN, "US0378331005")
            .with(COMPANY_NAME, "Apple Inc")
            .with(ISSUER_TYPE_CODE, "3")
            .with(ISSUE_CURRENCY, "1")
            .with(RISK_CURRENCY, "1")
            .with(COUPON_TYPE_CODE, "FIXED")
    }

    #[tokio::test]
    async fn test_type_selection_activates_new() {
        let (ctx, _) = context(MockBackend::new().with_next_id(900));
        let mut session = ctx.open(seed());
        session.apply_change(INVESTMENT_TYPE_CODE, "1").await.unwrap();

        assert_eq!(session.mode(), Mode::New);
        assert_eq!(session.draft().text(ID_INSTRUMENTO), "900");
        assert_eq!(session.draft().get(ES_INSTRUMENTO_NUEVO), Some(&FieldValue::Bool(true)));
        assert_eq!(session.current_step(), Some(StepPosition::Step(1)));
        assert_eq!(session.draft().text(NOMBRE_FUENTE), "APPLE 4.5 2030");
    }

    #[tokio::test]
    async fn test_read_only_fields_are_rejected() {
        let (ctx, _) = context(MockBackend::new());
        let mut session = ctx.open(seed());
        let err = session.apply_change(MONEDA, "2").await.unwrap_err();
        assert!(matches!(err, SessionError::ReadOnly { .. }));
        let err = session.apply_change(ISIN, "US0378331005").await.unwrap_err();
        assert!(matches!(err, SessionError::ReadOnly { mode: Mode::Idle, .. }));
    }

    #[tokio::test]
    async fn test_exact_match_inherits_and_locks() {
        let (ctx, _) = context(MockBackend::new().with_instrument(existing()));
        let mut session = ctx.open(seed());
        let found = session.match_existing("101").await.unwrap().unwrap();
        assert_eq!(found.mode, Mode::Exact);

        session.confirm_exact(&found.record).unwrap();
        assert_eq!(session.mode(), Mode::Exact);
        assert_eq!(session.draft().text(ISIN), "US0378331005");
        assert_eq!(session.draft().text(ID_INSTRUMENTO), "101");
        assert_eq!(session.company_state(), CompanyState::Selected);
        assert!(session.view().required_fields().is_empty());
        assert!(session.apply_change(NAME_INSTRUMENTO, "X").await.is_err());
    }

    #[tokio::test]
    async fn test_partial_match_leaves_currencies_open() {
        let (ctx, _) = context(MockBackend::new().with_instrument(existing()));
        let mut session = ctx.open(seed().with(MONEDA, "2"));
        let found = session.match_existing("101").await.unwrap().unwrap();
        assert_eq!(found.mode, Mode::Partial);

        session.confirm_partial(&found.record).unwrap();
        assert!(!session.draft().is_filled(ISSUE_CURRENCY));
        let view = session.view();
        let mut required = view.required_fields();
        required.sort();
        assert_eq!(required, vec![ISSUE_CURRENCY, RISK_CURRENCY]);
        session.apply_change(ISSUE_CURRENCY, "2").await.unwrap();
        assert!(session.apply_change(ISIN, "X").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_identifier_has_no_match() {
        let (ctx, _) = context(MockBackend::new().with_instrument(existing()));
        let session = ctx.open(seed());
        assert!(session.match_existing("555").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restructuring_round_trip() {
        let (ctx, _) = context(
            MockBackend::new()
                .with_instrument(existing())
                .with_next_id(900),
        );
        let mut session = ctx.open(seed());
        session.activate_new().await.unwrap();
        session.toggle_restructuring(true).await.unwrap();
        assert_eq!(session.mode(), Mode::Restructuring);
        assert_eq!(session.draft().text(ID_INSTRUMENTO), "901");

        session.resolve_predecessor("101", "1").await.unwrap();
        assert_eq!(session.draft().text(ISIN), "US0378331005");
        assert!(!session.draft().is_filled(COUPON_TYPE_CODE));
        assert_eq!(session.draft().text(ID_PREDECESOR), "101");

        session.toggle_restructuring(false).await.unwrap();
        assert_eq!(session.mode(), Mode::New);
        assert!(!session.draft().is_filled(ID_PREDECESOR));
        assert!(!session.draft().is_filled(ES_REESTRUCTURACION));
        assert_eq!(session.draft().text(ID_INSTRUMENTO), "901");
    }

    #[tokio::test]
    async fn test_missing_predecessor_is_inline_error() {
        let (ctx, _) = context(MockBackend::new());
        let mut session = ctx.open(seed());
        session.toggle_restructuring(true).await.unwrap();
        let before = session.draft().clone();

        let err = session.resolve_predecessor("404", "1").await.unwrap_err();
        assert!(matches!(err, SessionError::PredecessorNotFound { .. }));
        assert_eq!(session.mode(), Mode::Restructuring);
        assert!(session.predecessor_error().is_some());
        assert_eq!(session.draft(), &before);
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let (ctx, _) = context(MockBackend::new());
        let mut session = ctx.open(seed());
        session.confirm_exact(&existing()).unwrap();
        let err = session.toggle_restructuring(true).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));

        session.deactivate_new();
        session.toggle_restructuring(true).await.unwrap();
        assert!(session.confirm_partial(&existing()).is_err());
        assert!(session.confirm_exact(&existing()).is_err());
    }

    #[tokio::test]
    async fn test_deactivate_keeps_only_source_fields() {
        let (ctx, _) = context(MockBackend::new());
        let mut session = ctx.open(seed().with(NAME_INSTRUMENTO, "APPLE"));
        session.apply_change(INVESTMENT_TYPE_CODE, "2").await.unwrap();
        session.deactivate_new();
        assert_eq!(session.mode(), Mode::Idle);
        let names: Vec<&str> = session.draft().filled_fields().collect();
        assert_eq!(names.len(), 4);
        assert!(names.iter().all(|n| SOURCE_FIELDS.contains(n)));
    }

    #[tokio::test]
    async fn test_company_selection_and_reset() {
        let (ctx, _) = context(MockBackend::new().with_company(
            Company::new("Apple Inc").with_issuer_type("3").with_sector("45"),
        ));
        let mut session = ctx.open(seed());
        session.apply_change(INVESTMENT_TYPE_CODE, "1").await.unwrap();
        session.apply_change(COMPANY_NAME, "apple inc").await.unwrap();

        let state = session.check_exact_company("apple inc").await.unwrap();
        assert_eq!(state, CompanyState::Selected);
        assert_eq!(session.draft().text(ISSUER_TYPE_CODE), "3");
        assert!(session.apply_change(ISSUER_TYPE_CODE, "4").await.is_err());

        session.apply_change(COMPANY_NAME, "Apple Holdings").await.unwrap();
        assert_eq!(session.company_state(), CompanyState::Writing);
        assert!(!session.draft().is_filled(ISSUER_TYPE_CODE));

        let state = session.check_exact_company("Apple Holdings").await.unwrap();
        assert_eq!(state, CompanyState::New);
    }

    #[tokio::test]
    async fn test_stale_exact_company_result_is_ignored() {
        let (ctx, _) = context(MockBackend::new());
        let mut session = ctx.open(seed());
        session.apply_change(INVESTMENT_TYPE_CODE, "1").await.unwrap();
        session.apply_change(COMPANY_NAME, "Globex").await.unwrap();
        let state = session.apply_exact_company("Glob", Some(Company::new("Glob")));
        assert_eq!(state, CompanyState::Writing);
        assert_eq!(session.draft().text(COMPANY_NAME), "Globex");
    }

    #[tokio::test]
    async fn test_duplicates_feed_validation() {
        let (ctx, _) = context(MockBackend::new().with_instrument(existing()).with_next_id(900));
        let mut session = ctx.open(seed());
        session.apply_change(INVESTMENT_TYPE_CODE, "1").await.unwrap();
        session.apply_change(ISIN, "US0378331005").await.unwrap();
        session.refresh_duplicates().await.unwrap();

        assert!(session.duplicate_errors().contains_key(ISIN));
        let report = session.validate();
        assert_eq!(
            report.get(ISIN).map(|i| i.message.as_str()),
            Some("Ya existe un instrumento con este ISIN")
        );

        session.apply_change(ISIN, "US5949181045").await.unwrap();
        assert!(!session.duplicate_errors().contains_key(ISIN));
    }

    #[tokio::test]
    async fn test_field_options_from_catalog_and_static() {
        let (ctx, _) = context(MockBackend::new().with_catalog(
            "cashTypes",
            vec![
                CatalogEntry::new("1", "Caja"),
                CatalogEntry::new("2", "Old").inactive(),
            ],
        ));
        let mut session = ctx.open(seed());
        session.apply_change(INVESTMENT_TYPE_CODE, "3").await.unwrap();
        let options = session.field_options(CASH_TYPE_CODE).await.unwrap();
        assert_eq!(options.len(), 1);
        assert!(session.field_options("unknownField").await.unwrap().is_empty());

        session.deactivate_new();
        session.apply_change(INVESTMENT_TYPE_CODE, "7").await.unwrap();
        let legs = session.field_options(SUB_ID).await.unwrap();
        let values: Vec<&str> = legs.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["10000", "20000"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_unmounts_lookups() {
        let (ctx, _) = context(MockBackend::new());
        let session = ctx.open(seed());
        let lookups = session.lookups().clone();
        assert!(session.is_open());
        session.close();
        assert!(lookups.search_companies("acme").await.is_none());
    }
}
