//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod principal;
pub mod registration;

// Re-export commonly used models
pub use event::{
    CreateEventDetails, CreateEventRequest, Eligibility, Event, EventDetails, EventStatus, FieldType, FormField,
    ItemDetails, SeatLimited, StockLimited, UpdateEventRequest,
};
pub use principal::{ParticipantType, Principal, Role};
pub use registration::{
    AdmissionRequest, FormResponse, PaymentStatus, Registration, RegistrationStatus, Selections, TicketSnapshot,
};
