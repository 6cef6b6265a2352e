pub mod cache;
pub mod debounce;
pub mod lookups;
pub mod save;
pub mod session;

pub use cache::{CatalogStore, SingleFlightCache};
pub use debounce::{Debouncer, MountGuard, Ticket};
pub use lookups::{LookupSettings, Lookups};
pub use save::{build_payload, SaveOutcome};
pub use session::{EditSession, ExistingMatch, SessionContext, SessionError};
