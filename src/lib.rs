//! Server-rendered admin and student portals for a learning-management
//! system: a session guard, sidebar navigation with active-item
//! highlighting, and notification badges fed by count queries.

pub mod config;
pub mod database;
pub mod error;
pub mod layout;
pub mod nav;
pub mod routes;
pub mod session;

pub use config::PortalConfig;
pub use database::Database;
pub use error::PortalError;
