//! Debounced lookups against collaborator services.
//!
//! Every lookup takes a ticket for its key, waits out the debounce window and
//! only then calls the service. A lookup whose ticket was superseded, or whose
//! session closed while it was pending, resolves to `None` and must not be
//! applied.

use super::debounce::{Debouncer, MountGuard, Ticket};
use crate::datasource::{InstrumentLookup, ServiceError, Services};
use crate::domain::{Company, InstrumentRecord};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const COMPANY_SEARCH_KEY: &str = "company:search";
const COMPANY_EXACT_KEY: &str = "company:exact";
const PREDECESSOR_KEY: &str = "predecessor";

/// Timing knobs for debounced lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupSettings {
    pub debounce: Duration,
    pub duplicate_debounce: Duration,
    /// Company search texts shorter than this return no suggestions.
    pub min_search_len: usize,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            duplicate_debounce: Duration::from_millis(500),
            min_search_len: 2,
        }
    }
}

/// Message for a value already used by another instrument.
pub fn duplicate_message(field: &str) -> String {
    format!("Ya existe un instrumento con este {}", field.to_uppercase())
}

/// Undebounced duplicate check for one field. `Ok(None)` means the value is
/// free (or empty).
pub async fn find_duplicate(
    instruments: &dyn InstrumentLookup,
    field: &str,
    value: &str,
    exclude_id: Option<&str>,
) -> Result<Option<String>, ServiceError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    let check = instruments.check_duplicate(field, value, exclude_id).await?;
    Ok(check.is_duplicate.then(|| duplicate_message(field)))
}

/// Cloneable handle for running lookups on behalf of one session.
#[derive(Debug, Clone)]
pub struct Lookups {
    services: Services,
    lookups: Arc<Debouncer>,
    duplicates: Arc<Debouncer>,
    mount: MountGuard,
    min_search_len: usize,
}

impl Lookups {
    pub fn new(services: Services, settings: LookupSettings, mount: MountGuard) -> Self {
        Self {
            services,
            lookups: Arc::new(Debouncer::new(settings.debounce)),
            duplicates: Arc::new(Debouncer::new(settings.duplicate_debounce)),
            mount,
            min_search_len: settings.min_search_len,
        }
    }

    fn live(&self, debouncer: &Debouncer, ticket: &Ticket) -> bool {
        let live = self.mount.is_mounted() && debouncer.is_current(ticket);
        if !live {
            debug!(key = ticket.key(), "Discarding stale lookup");
        }
        live
    }

    async fn settled(&self, debouncer: &Debouncer, ticket: &Ticket) -> bool {
        debouncer.settle(ticket).await && self.live(debouncer, ticket)
    }

    /// Company suggestions for `text`.
    pub async fn search_companies(&self, text: &str) -> Option<Result<Vec<Company>, ServiceError>> {
        let ticket = self.lookups.issue(COMPANY_SEARCH_KEY);
        if text.trim().chars().count() < self.min_search_len {
            return Some(Ok(Vec::new()));
        }
        if !self.settled(&self.lookups, &ticket).await {
            return None;
        }
        debug!(text, "Searching companies");
        let result = self.services.companies.search(text.trim()).await;
        self.live(&self.lookups, &ticket).then_some(result)
    }

    /// Exact company match for `name`.
    pub async fn check_exact_company(
        &self,
        name: &str,
    ) -> Option<Result<Option<Company>, ServiceError>> {
        let ticket = self.lookups.issue(COMPANY_EXACT_KEY);
        if !self.settled(&self.lookups, &ticket).await {
            return None;
        }
        let result = self.services.companies.get_exact(name.trim()).await;
        self.live(&self.lookups, &ticket).then_some(result)
    }

    /// Fetch the record restructured into the draft.
    pub async fn fetch_predecessor(
        &self,
        id: &str,
        currency: &str,
    ) -> Option<Result<Option<InstrumentRecord>, ServiceError>> {
        let ticket = self.lookups.issue(PREDECESSOR_KEY);
        if !self.settled(&self.lookups, &ticket).await {
            return None;
        }
        debug!(id, currency, "Fetching predecessor");
        let result = self
            .services
            .instruments
            .get_by_id_and_currency(id, currency)
            .await;
        self.live(&self.lookups, &ticket).then_some(result)
    }

    /// Duplicate check for one field, debounced per field.
    ///
    /// Resolves to `Some(Some(message))` for a duplicate and `Some(None)` when
    /// the value is free. Service failures are logged and discarded.
    pub async fn check_duplicate(
        &self,
        field: &str,
        value: &str,
        exclude_id: Option<&str>,
    ) -> Option<Option<String>> {
        let ticket = self.duplicates.issue(&format!("duplicate:{}", field));
        if value.trim().is_empty() {
            return Some(None);
        }
        if !self.settled(&self.duplicates, &ticket).await {
            return None;
        }
        let result =
            find_duplicate(self.services.instruments.as_ref(), field, value, exclude_id).await;
        if !self.live(&self.duplicates, &ticket) {
            return None;
        }
        match result {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(field, error = %e, "Duplicate check failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockBackend;
    use crate::domain::fields;

    fn lookups(backend: Arc<MockBackend>) -> (Lookups, MountGuard) {
        let mount = MountGuard::new();
        let lookups = Lookups::new(
            Services::from_backend(backend),
            LookupSettings::default(),
            mount.clone(),
        );
        (lookups, mount)
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_search_skips_service() {
        let backend = Arc::new(MockBackend::new().with_company(Company::new("ACME")));
        let (lookups, _) = lookups(backend.clone());
        let result = lookups.search_companies("A").await.unwrap().unwrap();
        assert!(result.is_empty());
        assert_eq!(backend.search_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_searches_only_run_the_last() {
        let backend = Arc::new(
            MockBackend::new()
                .with_company(Company::new("ACME Corp"))
                .with_company(Company::new("Acme Holdings")),
        );
        let (lookups, _) = lookups(backend.clone());
        let (first, second, third) = tokio::join!(
            lookups.search_companies("ac"),
            lookups.search_companies("acm"),
            lookups.search_companies("acme h")
        );
        assert!(first.is_none());
        assert!(second.is_none());
        let found = third.unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].company_name, "Acme Holdings");
        assert_eq!(backend.search_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmounted_session_discards_result() {
        let backend = Arc::new(MockBackend::new().with_company(Company::new("ACME")));
        let (lookups, mount) = lookups(backend.clone());
        let pending = {
            let lookups = lookups.clone();
            tokio::spawn(async move { lookups.check_exact_company("ACME").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        mount.unmount();
        assert!(pending.await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_checks_are_per_field() {
        let backend = Arc::new(
            MockBackend::new().with_instrument(
                InstrumentRecord::new()
                    .with(fields::ID_INSTRUMENTO, 101)
                    .with(fields::ISIN, "US0378331005")
                    .with(fields::NAME_INSTRUMENTO, "APPLE 2030"),
            ),
        );
        let (lookups, _) = lookups(backend.clone());
        let (isin, name) = tokio::join!(
            lookups.check_duplicate(fields::ISIN, "US0378331005", None),
            lookups.check_duplicate(fields::NAME_INSTRUMENTO, "NEW NAME", None)
        );
        assert_eq!(
            isin,
            Some(Some("Ya existe un instrumento con este ISIN".to_string()))
        );
        assert_eq!(name, Some(None));
        assert_eq!(backend.duplicate_calls(), 2);

        let own = lookups
            .check_duplicate(fields::ISIN, "US0378331005", Some("101"))
            .await;
        assert_eq!(own, Some(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_predecessor_lookup() {
        let backend = Arc::new(
            MockBackend::new().with_instrument(
                InstrumentRecord::new()
                    .with(fields::ID_INSTRUMENTO, 101)
                    .with(fields::MONEDA, "1"),
            ),
        );
        let (lookups, _) = lookups(backend);
        let found = lookups.fetch_predecessor("101", "1").await.unwrap().unwrap();
        assert!(found.is_some());
        let missing = lookups.fetch_predecessor("101", "9").await.unwrap().unwrap();
        assert!(missing.is_none());
    }
}
