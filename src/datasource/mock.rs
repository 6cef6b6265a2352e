//! In-memory backend for tests and local runs without the back office API.

use super::{
    CatalogProvider, CompanyService, DuplicateCheck, InstrumentLookup, InstrumentStore,
    ServiceError, WorkQueue,
};
use crate::domain::{fields, CatalogEntry, Company, InstrumentRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Mock backend holding every collaborator's data in memory.
#[derive(Debug)]
pub struct MockBackend {
    catalogs: HashMap<String, Vec<CatalogEntry>>,
    instruments: Mutex<Vec<InstrumentRecord>>,
    companies: Mutex<Vec<Company>>,
    completed: Mutex<Vec<String>>,
    next_id: AtomicI64,
    latency: Option<Duration>,
    store_failure: Option<ServiceError>,
    company_create_failure: Option<ServiceError>,
    queue_failure: Option<ServiceError>,
    catalog_calls: AtomicUsize,
    get_all_calls: AtomicUsize,
    search_calls: AtomicUsize,
    duplicate_calls: AtomicUsize,
    company_creates: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            catalogs: HashMap::new(),
            instruments: Mutex::new(Vec::new()),
            companies: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            latency: None,
            store_failure: None,
            company_create_failure: None,
            queue_failure: None,
            catalog_calls: AtomicUsize::new(0),
            get_all_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            duplicate_calls: AtomicUsize::new(0),
            company_creates: AtomicUsize::new(0),
        }
    }

    pub fn with_catalog(mut self, name: &str, entries: Vec<CatalogEntry>) -> Self {
        self.catalogs.insert(name.to_string(), entries);
        self
    }

    pub fn with_instrument(mut self, record: InstrumentRecord) -> Self {
        self.instruments.get_mut().push(record);
        self
    }

    pub fn with_company(mut self, company: Company) -> Self {
        self.companies.get_mut().push(company);
        self
    }

    /// First id handed out by `next_id`.
    pub fn with_next_id(self, id: i64) -> Self {
        self.next_id.store(id, Ordering::SeqCst);
        self
    }

    /// Delay applied to catalog and universe loads.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make instrument create/update fail with `error`.
    pub fn with_store_failure(mut self, error: ServiceError) -> Self {
        self.store_failure = Some(error);
        self
    }

    pub fn with_company_create_failure(mut self, error: ServiceError) -> Self {
        self.company_create_failure = Some(error);
        self
    }

    pub fn with_queue_failure(mut self, error: ServiceError) -> Self {
        self.queue_failure = Some(error);
        self
    }

    pub async fn instruments(&self) -> Vec<InstrumentRecord> {
        self.instruments.lock().await.clone()
    }

    pub async fn companies(&self) -> Vec<Company> {
        self.companies.lock().await.clone()
    }

    pub async fn completed(&self) -> Vec<String> {
        self.completed.lock().await.clone()
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn get_all_calls(&self) -> usize {
        self.get_all_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn duplicate_calls(&self) -> usize {
        self.duplicate_calls.load(Ordering::SeqCst)
    }

    pub fn company_creates(&self) -> usize {
        self.company_creates.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn same_key(record: &InstrumentRecord, id: &str, currency: &str) -> bool {
    record.text(fields::ID_INSTRUMENTO) == id.trim() && record.text(fields::MONEDA) == currency.trim()
}

#[async_trait]
impl CatalogProvider for MockBackend {
    async fn fetch(&self, name: &str) -> Result<Vec<CatalogEntry>, ServiceError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.catalogs
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("catalog {}", name)))
    }
}

#[async_trait]
impl InstrumentLookup for MockBackend {
    async fn get_by_id_and_currency(
        &self,
        id: &str,
        currency: &str,
    ) -> Result<Option<InstrumentRecord>, ServiceError> {
        Ok(self
            .instruments
            .lock()
            .await
            .iter()
            .find(|r| same_key(r, id, currency))
            .cloned())
    }

    async fn next_id(&self) -> Result<i64, ServiceError> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn get_all(&self) -> Result<Vec<InstrumentRecord>, ServiceError> {
        self.get_all_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.instruments.lock().await.clone())
    }

    async fn check_duplicate(
        &self,
        field: &str,
        value: &str,
        exclude_id: Option<&str>,
    ) -> Result<DuplicateCheck, ServiceError> {
        self.duplicate_calls.fetch_add(1, Ordering::SeqCst);
        let existing: Vec<InstrumentRecord> = self
            .instruments
            .lock()
            .await
            .iter()
            .filter(|r| r.text(field) == value.trim())
            .filter(|r| exclude_id.map_or(true, |id| r.text(fields::ID_INSTRUMENTO) != id.trim()))
            .cloned()
            .collect();
        Ok(DuplicateCheck {
            is_duplicate: !existing.is_empty(),
            existing,
        })
    }
}

#[async_trait]
impl CompanyService for MockBackend {
    async fn search(&self, text: &str) -> Result<Vec<Company>, ServiceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let needle = text.trim().to_lowercase();
        Ok(self
            .companies
            .lock()
            .await
            .iter()
            .filter(|c| c.company_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn get_exact(&self, name: &str) -> Result<Option<Company>, ServiceError> {
        Ok(self
            .companies
            .lock()
            .await
            .iter()
            .find(|c| c.matches_name(name))
            .cloned())
    }

    async fn create(&self, company: &Company) -> Result<Company, ServiceError> {
        self.company_creates.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.company_create_failure {
            return Err(error.clone());
        }
        let mut companies = self.companies.lock().await;
        if companies.iter().any(|c| c.matches_name(&company.company_name)) {
            return Err(ServiceError::Conflict(company.company_name.clone()));
        }
        let mut created = company.clone();
        created.id = Some(companies.len() as i64 + 1);
        companies.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl InstrumentStore for MockBackend {
    async fn create(&self, record: &InstrumentRecord) -> Result<(), ServiceError> {
        if let Some(error) = &self.store_failure {
            return Err(error.clone());
        }
        self.instruments.lock().await.push(record.clone());
        Ok(())
    }

    async fn update(&self, id: &str, record: &InstrumentRecord) -> Result<(), ServiceError> {
        if let Some(error) = &self.store_failure {
            return Err(error.clone());
        }
        let currency = record.text(fields::MONEDA);
        let mut instruments = self.instruments.lock().await;
        if let Some(existing) = instruments.iter_mut().find(|r| same_key(r, id, &currency)) {
            *existing = record.clone();
            return Ok(());
        }
        // A known id in a new currency gains a row.
        if instruments
            .iter()
            .any(|r| r.text(fields::ID_INSTRUMENTO) == id.trim())
        {
            instruments.push(record.clone());
            return Ok(());
        }
        Err(ServiceError::NotFound(format!("instrument {}/{}", id, currency)))
    }
}

#[async_trait]
impl WorkQueue for MockBackend {
    async fn mark_completed(&self, queue_item_id: &str) -> Result<(), ServiceError> {
        if let Some(error) = &self.queue_failure {
            return Err(error.clone());
        }
        self.completed.lock().await.push(queue_item_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bond(id: i64, currency: &str, isin: &str) -> InstrumentRecord {
        InstrumentRecord::new()
            .with(fields::ID_INSTRUMENTO, id)
            .with(fields::MONEDA, currency)
            .with(fields::ISIN, isin)
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_currency() {
        let mock = MockBackend::new().with_instrument(bond(101, "1", "US0378331005"));
        let found = mock.get_by_id_and_currency("101", "1").await.unwrap();
        assert!(found.is_some());
        assert!(mock.get_by_id_and_currency("101", "2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_id_increments() {
        let mock = MockBackend::new().with_next_id(500);
        assert_eq!(mock.next_id().await.unwrap(), 500);
        assert_eq!(mock.next_id().await.unwrap(), 501);
    }

    #[tokio::test]
    async fn test_check_duplicate_excludes_own_id() {
        let mock = MockBackend::new().with_instrument(bond(101, "1", "US0378331005"));
        let check = mock
            .check_duplicate(fields::ISIN, "US0378331005", None)
            .await
            .unwrap();
        assert!(check.is_duplicate);
        let own = mock
            .check_duplicate(fields::ISIN, "US0378331005", Some("101"))
            .await
            .unwrap();
        assert!(!own.is_duplicate);
        assert_eq!(mock.duplicate_calls(), 2);
    }

    #[tokio::test]
    async fn test_company_create_conflict() {
        let mock = MockBackend::new().with_company(Company::new("ACME Corp"));
        let err = CompanyService::create(&mock, &Company::new("acme corp"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let created = CompanyService::create(&mock, &Company::new("Globex"))
            .await
            .unwrap();
        assert_eq!(created.id, Some(2));
        assert_eq!(mock.search("glo").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_existing_record() {
        let mock = MockBackend::new().with_instrument(bond(101, "1", "US0378331005"));
        let updated = bond(101, "1", "US0378331005").with(fields::RISK_CURRENCY, "1");
        InstrumentStore::update(&mock, "101", &updated).await.unwrap();
        assert_eq!(mock.instruments().await[0], updated);

        let other_currency = bond(101, "2", "US0378331005");
        InstrumentStore::update(&mock, "101", &other_currency).await.unwrap();
        assert_eq!(mock.instruments().await.len(), 2);

        let err = InstrumentStore::update(&mock, "999", &updated).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_catalog_is_not_found() {
        let mock = MockBackend::new().with_catalog("paises", vec![CatalogEntry::new("CL", "Chile")]);
        assert_eq!(mock.fetch("paises").await.unwrap().len(), 1);
        assert!(matches!(
            mock.fetch("monedas").await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(mock.catalog_calls(), 2);
    }
}
