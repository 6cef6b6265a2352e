//! Domain types for instrument classification.
//!
//! This module provides:
//! - Scalar field values with loose, string-normalized comparison
//! - The instrument record draft and atomic update batches
//! - Editing modes and company selection state
//! - Canonical field names and field families

pub mod company;
pub mod decimal;
pub mod fields;
pub mod mode;
pub mod record;
pub mod value;

pub use company::{CatalogEntry, Company};
pub use decimal::Decimal;
pub use mode::{CompanyState, Mode};
pub use record::{FieldUpdates, InstrumentRecord};
pub use value::FieldValue;
