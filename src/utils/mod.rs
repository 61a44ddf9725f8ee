//! Utility modules
//!
//! This module contains common utilities used throughout the application,
//! including error handling, logging setup, the time source and helper functions.

pub mod clock;
pub mod errors;
pub mod helpers;
pub mod logging;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{ErrorKind, EventPassError, Result};
