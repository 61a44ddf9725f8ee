//! Test helpers module
//!
//! Shared context, fixtures and fake collaborators for the integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod senders;

pub use fixtures::*;
pub use senders::*;

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use EventPass::config::Settings;
use EventPass::models::{Event, EventStatus, Principal};
use EventPass::services::{NotificationService, ServiceFactory};
use EventPass::{FixedClock, MemoryStore};

/// Instant every test clock starts at
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Memory-backed services with a pinned clock and one organizer
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub clock: FixedClock,
    pub settings: Settings,
    pub services: ServiceFactory<MemoryStore>,
    pub organizer: Principal,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_notifications(Arc::new(MemoryStore::new()), NotificationService::disabled())
    }

    pub fn with_notifications(store: Arc<MemoryStore>, notifications: NotificationService) -> Self {
        let clock = FixedClock::new(base_time());
        let settings = Settings::default();
        let services = ServiceFactory::new(store.clone(), &settings, Arc::new(clock.clone()), notifications);

        Self {
            store,
            clock,
            settings,
            services,
            organizer: organizer("Robotics Club"),
        }
    }

    /// Create and publish a seat-limited event with one required text field
    pub async fn published_seat_event(&self, limit: i32) -> Event {
        let event = self
            .services
            .events
            .create(&self.organizer, seat_event_request(limit, 0))
            .await
            .expect("create seat event");
        self.publish(&event).await
    }

    /// Create and publish a stock-limited event
    pub async fn published_stock_event(&self, stock: i32, purchase_limit: i32) -> Event {
        let event = self
            .services
            .events
            .create(&self.organizer, stock_event_request(Some(stock), purchase_limit))
            .await
            .expect("create stock event");
        self.publish(&event).await
    }

    pub async fn publish(&self, event: &Event) -> Event {
        self.services
            .events
            .change_status(&self.organizer, event.id, EventStatus::Published)
            .await
            .expect("publish event")
    }

    /// Move the clock past the registration deadline of `event`
    pub fn pass_deadline(&self, event: &Event) {
        self.clock.set(event.registration_deadline + Duration::minutes(1));
    }
}
