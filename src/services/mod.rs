//! Services module
//!
//! This module contains the business logic services

pub mod admission;
pub mod events;
pub mod notification;
pub mod ticket;

// Re-export commonly used services
pub use admission::AdmissionService;
pub use events::EventService;
pub use notification::{
    DiscordWebhookNotifier, EmailOutcome, EmailSender, LogEmailSender, Notification, NotificationService,
    NotificationStats, OutgoingEmail, SmtpEmailSender,
};
pub use ticket::{IssuedTicket, TicketIssuer, TicketPayload};

use std::sync::Arc;

use crate::config::Settings;
use crate::database::Store;
use crate::utils::clock::Clock;

/// Service factory wiring every service to one store, clock and notification queue
pub struct ServiceFactory<S: Store> {
    pub events: EventService<S>,
    pub admissions: AdmissionService<S>,
    pub notifications: NotificationService,
}

impl<S: Store> Clone for ServiceFactory<S> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            admissions: self.admissions.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

impl<S: Store> ServiceFactory<S> {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(store: Arc<S>, settings: &Settings, clock: Arc<dyn Clock>, notifications: NotificationService) -> Self {
        let issuer = TicketIssuer::new(&settings.tickets);

        Self {
            events: EventService::new(store.clone(), clock.clone(), notifications.clone()),
            admissions: AdmissionService::new(store, issuer, clock, notifications.clone()),
            notifications,
        }
    }
}
