pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod registry;

pub use config::Config;
pub use datasource::{HttpBackend, MockBackend, ServiceError, Services};
pub use domain::{CompanyState, FieldValue, InstrumentRecord, Mode};
pub use engine::{FormView, StepPosition, ValidationReport};
pub use error::AppError;
pub use orchestration::{EditSession, SessionContext, SessionError};
pub use registry::{AssetTypeConfig, Registry};
