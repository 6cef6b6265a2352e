//! Collaborator services: catalogs, the instrument universe, companies,
//! persistence and the work queue.

use crate::domain::{CatalogEntry, Company, InstrumentRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod http;
pub mod mock;

pub use http::HttpBackend;
pub use mock::MockBackend;

/// Named option catalogs (countries, currencies, sectors, ...).
#[async_trait]
pub trait CatalogProvider: Send + Sync + fmt::Debug {
    /// Fetch every entry of catalog `name`, active or not.
    async fn fetch(&self, name: &str) -> Result<Vec<CatalogEntry>, ServiceError>;
}

/// Read access to existing instruments.
#[async_trait]
pub trait InstrumentLookup: Send + Sync + fmt::Debug {
    /// The record keyed by `(id, currency)`, or `None` when absent.
    async fn get_by_id_and_currency(
        &self,
        id: &str,
        currency: &str,
    ) -> Result<Option<InstrumentRecord>, ServiceError>;

    /// Next free instrument id.
    async fn next_id(&self) -> Result<i64, ServiceError>;

    /// The whole instrument universe.
    async fn get_all(&self) -> Result<Vec<InstrumentRecord>, ServiceError>;

    /// Existing records holding `value` in `field`, ignoring `exclude_id`.
    async fn check_duplicate(
        &self,
        field: &str,
        value: &str,
        exclude_id: Option<&str>,
    ) -> Result<DuplicateCheck, ServiceError>;
}

#[async_trait]
pub trait CompanyService: Send + Sync + fmt::Debug {
    async fn search(&self, text: &str) -> Result<Vec<Company>, ServiceError>;

    /// Case-insensitive exact name match.
    async fn get_exact(&self, name: &str) -> Result<Option<Company>, ServiceError>;

    /// Create a company. An existing name is reported as [`ServiceError::Conflict`].
    async fn create(&self, company: &Company) -> Result<Company, ServiceError>;
}

#[async_trait]
pub trait InstrumentStore: Send + Sync + fmt::Debug {
    async fn create(&self, record: &InstrumentRecord) -> Result<(), ServiceError>;

    async fn update(&self, id: &str, record: &InstrumentRecord) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait WorkQueue: Send + Sync + fmt::Debug {
    async fn mark_completed(&self, queue_item_id: &str) -> Result<(), ServiceError>;
}

/// Result of a duplicate-value lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    #[serde(default, rename = "data")]
    pub existing: Vec<InstrumentRecord>,
}

/// Handles to every collaborator an editing session needs.
#[derive(Debug, Clone)]
pub struct Services {
    pub catalogs: Arc<dyn CatalogProvider>,
    pub instruments: Arc<dyn InstrumentLookup>,
    pub companies: Arc<dyn CompanyService>,
    pub store: Arc<dyn InstrumentStore>,
    pub queue: Arc<dyn WorkQueue>,
}

impl Services {
    /// Use one backend for every collaborator.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CatalogProvider + InstrumentLookup + CompanyService + InstrumentStore + WorkQueue + 'static,
    {
        Self {
            catalogs: backend.clone(),
            instruments: backend.clone(),
            companies: backend.clone(),
            store: backend.clone(),
            queue: backend,
        }
    }
}

/// Error type for collaborator calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error not covered by a more specific variant
    HttpError { status: u16, message: String },
    /// Invalid JSON or unexpected response shape
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    NotFound(String),
    /// The resource already exists
    Conflict(String),
    Other(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ServiceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ServiceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ServiceError::RateLimited => write!(f, "Rate limited"),
            ServiceError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}
