//! Pure rule evaluation: conditions, cascades, wizard steps, visibility,
//! validation and inheritance.

pub mod cascade;
pub mod condition;
pub mod inheritance;
pub mod step;
pub mod validation;
pub mod visibility;

pub use cascade::{compute_cascade, BatchContext, CascadeOutcome};
pub use condition::{Condition, ValueGate};
pub use step::{calculate_step, current_step, StepPosition};
pub use validation::{validate, ValidationIssue, ValidationReport};
pub use visibility::{FormView, Resolver};
