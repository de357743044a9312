pub mod durable;
pub mod error;
pub mod store;

pub use durable::{DurableStore, FileDurable, MemoryDurable};
pub use error::StoreError;
pub use store::{StateListener, StateStore, Subscription};
