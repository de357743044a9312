pub mod auth;
pub mod bootstrap;
pub mod ui;

pub use auth::AuthManager;
pub use bootstrap::{bootstrap, App};
pub use ui::ConsoleUi;
