//! EventPass
//!
//! Registration admission control for capacity- and stock-limited events.
//! Organizers publish events, participants register or purchase, and every
//! admission reserves a seat or stock atomically, issues a unique ticket and
//! can be unwound by cancellation.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{ErrorKind, EventPassError, Result};

// Re-export main components for easy access
pub use database::{MemoryStore, PgStore, Store, UnitOfWork};
pub use services::{AdmissionService, EventService, NotificationService, ServiceFactory, TicketIssuer};
pub use utils::clock::{Clock, FixedClock, SystemClock};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
