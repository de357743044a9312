pub mod error;
pub mod state;
pub mod types;
mod tests;

pub use error::DomainError;
pub use state::{AppState, DurableSession, StatePatch};
pub use types::{FilterSpec, Listing, ListingId, ListingKind, Role, UserId, UserIdentity};
