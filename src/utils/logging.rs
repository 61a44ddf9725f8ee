//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the admission engine.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::utils::errors::{EventPassError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file appender when dropped and must be
/// held for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| EventPassError::Config(format!("Invalid log filter '{}': {}", config.level, e)))?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EventPassError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a committed admission
pub fn log_admission(registration_id: Uuid, event_id: Uuid, participant_id: Uuid, ticket_id: &str, quantity: i32) {
    info!(
        registration_id = %registration_id,
        event_id = %event_id,
        participant_id = %participant_id,
        ticket_id = ticket_id,
        quantity = quantity,
        "Admission committed"
    );
}

/// Log an admission rejected by a precondition
pub fn log_admission_rejected(event_id: Uuid, participant_id: Uuid, error: &EventPassError) {
    match error.kind() {
        crate::utils::errors::ErrorKind::Infrastructure => error!(
            event_id = %event_id,
            participant_id = %participant_id,
            code = error.code(),
            error = %error,
            "Admission failed"
        ),
        _ => debug!(
            event_id = %event_id,
            participant_id = %participant_id,
            code = error.code(),
            "Admission rejected"
        ),
    }
}

/// Log a committed cancellation
pub fn log_cancellation(registration_id: Uuid, event_id: Uuid, restored_units: i32) {
    info!(
        registration_id = %registration_id,
        event_id = %event_id,
        restored_units = restored_units,
        "Registration cancelled"
    );
}

/// Log event management actions
pub fn log_event_action(event_id: Uuid, action: &str, principal_id: Uuid, details: Option<&str>) {
    info!(
        event_id = %event_id,
        action = action,
        principal_id = %principal_id,
        details = details,
        "Event action performed"
    );
}

/// Log a best-effort side effect that did not go through
pub fn log_notification_failure(kind: &str, target: &str, error: &EventPassError) {
    warn!(
        notification = kind,
        target = target,
        error = %error,
        "Notification delivery failed"
    );
}
