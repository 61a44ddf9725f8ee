//! Event state rules
//!
//! This module holds the lifecycle state machine and admission payload checks

pub mod lifecycle;
pub mod payload;

// Re-export commonly used state components
pub use lifecycle::{apply_update, can_transition, ensure_transition, validate_for_publish};
pub use payload::validate_payload;
