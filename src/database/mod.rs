//! Database module
//!
//! Storage traits plus the Postgres and in-memory implementations

pub mod connection;
pub mod memory;
pub mod postgres;
pub mod repositories;
pub mod store;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repositories::{EventRepository, RegistrationRepository};
pub use store::{Store, UnitOfWork};
