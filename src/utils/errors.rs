//! Error handling for EventPass
//!
//! This module defines the main error type used throughout the crate
//! and the taxonomy callers use to map failures to user-facing responses.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for EventPass
#[derive(Error, Debug)]
pub enum EventPassError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Ticket rendering error: {0}")]
    TicketRender(String),

    #[error("Ticket id collision: {ticket_id}")]
    TicketCollision { ticket_id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Registration is not available while the event is {status}")]
    RegistrationUnavailable { status: String },

    #[error("You are not eligible for this event")]
    IneligibleParticipant,

    #[error("Registration deadline passed")]
    DeadlinePassed,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Event cannot be published: {}", .reasons.join("; "))]
    PublishValidationFailed { reasons: Vec<String> },

    #[error("Field '{field}' cannot be edited while the event is {status}")]
    FieldNotEditable { field: String, status: String },

    #[error("Form fields are locked after the first registration")]
    FormLocked,

    #[error("Registration deadline can only be extended")]
    DeadlineExtensionRequired,

    #[error("Registration limit can only be increased")]
    LimitIncreaseRequired,

    #[error("Event has {count} active registrations")]
    HasRegistrations { count: i64 },

    #[error("Registration is already cancelled")]
    AlreadyCancelled,

    #[error("Event has already started")]
    EventStarted,

    #[error("You are already registered for this event")]
    DuplicateRegistration,

    #[error("Event registration limit reached")]
    CapacityReached,

    #[error("Insufficient stock or item sold out")]
    StockExhausted,

    #[error("Purchase limit exceeded: requested {requested}, limit {limit}")]
    PurchaseLimitExceeded { requested: i32, limit: i32 },
}

/// Result type alias for EventPass operations
pub type Result<T> = std::result::Result<T, EventPassError>;

/// Coarse classification of failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete input, rejected before any mutation
    Validation,
    /// The request is well-formed but the current state forbids it
    State,
    /// Lost a race for a finite resource; the client may retry
    Contention,
    /// Store or transport failure
    Infrastructure,
}

impl EventPassError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        EventPassError::NotFound { entity, id }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EventPassError::InvalidInput(_)
            | EventPassError::PublishValidationFailed { .. } => ErrorKind::Validation,

            EventPassError::NotFound { .. }
            | EventPassError::PermissionDenied(_)
            | EventPassError::RegistrationUnavailable { .. }
            | EventPassError::IneligibleParticipant
            | EventPassError::DeadlinePassed
            | EventPassError::InvalidTransition { .. }
            | EventPassError::FieldNotEditable { .. }
            | EventPassError::FormLocked
            | EventPassError::DeadlineExtensionRequired
            | EventPassError::LimitIncreaseRequired
            | EventPassError::HasRegistrations { .. }
            | EventPassError::AlreadyCancelled
            | EventPassError::EventStarted
            | EventPassError::PurchaseLimitExceeded { .. } => ErrorKind::State,

            EventPassError::DuplicateRegistration
            | EventPassError::CapacityReached
            | EventPassError::StockExhausted => ErrorKind::Contention,

            EventPassError::Database(_)
            | EventPassError::Migration(_)
            | EventPassError::Http(_)
            | EventPassError::Email(_)
            | EventPassError::Serialization(_)
            | EventPassError::Io(_)
            | EventPassError::UrlParse(_)
            | EventPassError::Config(_)
            | EventPassError::ServiceUnavailable(_)
            | EventPassError::TicketRender(_)
            | EventPassError::TicketCollision { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EventPassError::Database(_) => "DATABASE_ERROR",
            EventPassError::Migration(_) => "MIGRATION_ERROR",
            EventPassError::Http(_) => "HTTP_ERROR",
            EventPassError::Email(_) => "EMAIL_ERROR",
            EventPassError::Serialization(_) => "SERIALIZATION_ERROR",
            EventPassError::Io(_) => "IO_ERROR",
            EventPassError::UrlParse(_) => "INVALID_URL",
            EventPassError::Config(_) => "CONFIG_ERROR",
            EventPassError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            EventPassError::TicketRender(_) => "TICKET_RENDER_ERROR",
            EventPassError::TicketCollision { .. } => "TICKET_COLLISION",
            EventPassError::InvalidInput(_) => "INVALID_INPUT",
            EventPassError::NotFound { entity: "event", .. } => "EVENT_NOT_FOUND",
            EventPassError::NotFound { .. } => "NOT_FOUND",
            EventPassError::PermissionDenied(_) => "PERMISSION_DENIED",
            EventPassError::RegistrationUnavailable { .. } => "REGISTRATION_UNAVAILABLE",
            EventPassError::IneligibleParticipant => "INELIGIBLE_PARTICIPANT",
            EventPassError::DeadlinePassed => "DEADLINE_PASSED",
            EventPassError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EventPassError::PublishValidationFailed { .. } => "PUBLISH_VALIDATION_FAILED",
            EventPassError::FieldNotEditable { .. } => "FIELD_NOT_EDITABLE",
            EventPassError::FormLocked => "FORM_LOCKED",
            EventPassError::DeadlineExtensionRequired => "DEADLINE_EXTENSION_REQUIRED",
            EventPassError::LimitIncreaseRequired => "LIMIT_INCREASE_REQUIRED",
            EventPassError::HasRegistrations { .. } => "HAS_REGISTRATIONS",
            EventPassError::AlreadyCancelled => "ALREADY_CANCELLED",
            EventPassError::EventStarted => "EVENT_STARTED",
            EventPassError::DuplicateRegistration => "DUPLICATE_REGISTRATION",
            EventPassError::CapacityReached => "CAPACITY_REACHED",
            EventPassError::StockExhausted => "STOCK_EXHAUSTED",
            EventPassError::PurchaseLimitExceeded { .. } => "PURCHASE_LIMIT_EXCEEDED",
        }
    }

    /// Whether a client may reasonably retry the same request later.
    /// The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            ErrorKind::Contention => true,
            ErrorKind::Infrastructure => !matches!(
                self,
                EventPassError::Config(_)
                    | EventPassError::Migration(_)
                    | EventPassError::UrlParse(_)
                    | EventPassError::TicketRender(_)
            ),
            ErrorKind::Validation | ErrorKind::State => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventPassError::Database(_) => ErrorSeverity::Critical,
            EventPassError::Migration(_) => ErrorSeverity::Critical,
            EventPassError::Config(_) => ErrorSeverity::Critical,
            EventPassError::TicketCollision { .. } => ErrorSeverity::Error,
            EventPassError::PermissionDenied(_) => ErrorSeverity::Warning,
            _ => match self.kind() {
                ErrorKind::Validation | ErrorKind::State | ErrorKind::Contention => ErrorSeverity::Info,
                ErrorKind::Infrastructure => ErrorSeverity::Error,
            },
        }
    }
}

impl From<lettre::error::Error> for EventPassError {
    fn from(err: lettre::error::Error) -> Self {
        EventPassError::Email(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for EventPassError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        EventPassError::Email(err.to_string())
    }
}

impl From<lettre::address::AddressError> for EventPassError {
    fn from(err: lettre::address::AddressError) -> Self {
        EventPassError::Email(err.to_string())
    }
}

impl From<qrcode::types::QrError> for EventPassError {
    fn from(err: qrcode::types::QrError) -> Self {
        EventPassError::TicketRender(err.to_string())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
