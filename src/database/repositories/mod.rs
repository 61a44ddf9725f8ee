//! Database repositories module
//!
//! This module contains the SQL for each table

pub mod event;
pub mod registration;

// Re-export repositories
pub use event::EventRepository;
pub use registration::RegistrationRepository;
