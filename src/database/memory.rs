//! In-process store
//!
//! A unit of work takes the store's lock for its whole lifetime and mutates a
//! staged copy of the state, so concurrent units are fully serialized and a
//! unit that is dropped without committing leaves no trace. The same
//! constraints the Postgres schema enforces are checked here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::store::{Store, UnitOfWork};
use crate::models::{Event, EventDetails, EventStatus, PaymentStatus, Registration, RegistrationStatus};
use crate::utils::errors::{EventPassError, Result};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: HashMap<Uuid, Event>,
    /// Deleted events, kept out of every read
    deleted_events: HashMap<Uuid, Event>,
    registrations: HashMap<Uuid, Registration>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryState {
    fn event_mut(&mut self, id: Uuid) -> Result<&mut Event> {
        self.events
            .get_mut(&id)
            .ok_or_else(|| EventPassError::not_found("event", id))
    }

    fn registration_by_pair(&self, event_id: Uuid, participant_id: Uuid) -> Option<&Registration> {
        self.registrations
            .values()
            .find(|r| r.event_id == event_id && r.participant_id == participant_id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryUnitOfWork { guard, staged })
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>> {
        Ok(self.state.lock().await.registrations.get(&id).cloned())
    }

    async fn find_registration_by_ticket(&self, ticket_id: &str) -> Result<Option<Registration>> {
        let state = self.state.lock().await;
        Ok(state
            .registrations
            .values()
            .find(|r| r.ticket_id.as_deref() == Some(ticket_id))
            .cloned())
    }

    async fn list_event_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        let state = self.state.lock().await;
        let mut registrations: Vec<Registration> = state
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.created_at);
        Ok(registrations)
    }

    async fn list_participant_registrations(&self, participant_id: Uuid) -> Result<Vec<Registration>> {
        let state = self.state.lock().await;
        let mut registrations: Vec<Registration> = state
            .registrations
            .values()
            .filter(|r| r.participant_id == participant_id)
            .cloned()
            .collect();
        registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(registrations)
    }

    async fn mark_confirmation_sent(&self, registration_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        let registration = state
            .registrations
            .get_mut(&registration_id)
            .ok_or_else(|| EventPassError::not_found("registration", registration_id))?;
        registration.confirmation_email_sent = true;
        registration.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_event(&mut self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.staged.events.get(&id).cloned())
    }

    async fn lock_event(&mut self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.staged.events.get(&id).cloned())
    }

    async fn insert_event(&mut self, event: &Event) -> Result<()> {
        if self.staged.events.contains_key(&event.id) || self.staged.deleted_events.contains_key(&event.id) {
            return Err(EventPassError::InvalidInput(format!("Event {} already exists", event.id)));
        }
        self.staged.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&mut self, event: &Event) -> Result<Event> {
        let stored = self.staged.event_mut(event.id)?;

        let details = match (&stored.details, &event.details) {
            (EventDetails::SeatLimited(current), EventDetails::SeatLimited(new)) => {
                let mut merged = new.clone();
                merged.seats_taken = current.seats_taken;
                merged.form_locked = current.form_locked;
                EventDetails::SeatLimited(merged)
            }
            (EventDetails::StockLimited(_), EventDetails::StockLimited(new)) => EventDetails::StockLimited(new.clone()),
            _ => {
                return Err(EventPassError::InvalidInput(
                    "Event type cannot be changed".to_string(),
                ))
            }
        };

        *stored = Event {
            details,
            organizer_id: stored.organizer_id,
            discord_webhook_url: stored.discord_webhook_url.clone(),
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..event.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_event(&mut self, id: Uuid) -> Result<()> {
        if let Some(event) = self.staged.events.remove(&id) {
            self.staged.deleted_events.insert(id, event);
        }
        Ok(())
    }

    async fn count_active_registrations(&mut self, event_id: Uuid) -> Result<i64> {
        Ok(self
            .staged
            .registrations
            .values()
            .filter(|r| r.event_id == event_id && r.is_active())
            .count() as i64)
    }

    async fn reserve_seat(&mut self, event_id: Uuid) -> Result<bool> {
        let event = self.staged.event_mut(event_id)?;
        if event.status != EventStatus::Published {
            return Ok(false);
        }
        match &mut event.details {
            EventDetails::SeatLimited(seat) => match seat.registration_limit {
                Some(limit) if seat.seats_taken < limit => {
                    seat.seats_taken += 1;
                    Ok(true)
                }
                _ => Ok(false),
            },
            EventDetails::StockLimited(_) => Ok(false),
        }
    }

    async fn release_seat(&mut self, event_id: Uuid) -> Result<()> {
        let event = self.staged.event_mut(event_id)?;
        if let EventDetails::SeatLimited(seat) = &mut event.details {
            seat.seats_taken = (seat.seats_taken - 1).max(0);
        }
        Ok(())
    }

    async fn reserve_stock(&mut self, event_id: Uuid, quantity: i32) -> Result<bool> {
        let event = self.staged.event_mut(event_id)?;
        if event.status != EventStatus::Published {
            return Ok(false);
        }
        match &mut event.details {
            EventDetails::StockLimited(stock) => match stock.stock_quantity {
                Some(available) if available >= quantity => {
                    stock.stock_quantity = Some(available - quantity);
                    Ok(true)
                }
                _ => Ok(false),
            },
            EventDetails::SeatLimited(_) => Ok(false),
        }
    }

    async fn restore_stock(&mut self, event_id: Uuid, quantity: i32) -> Result<()> {
        let event = self.staged.event_mut(event_id)?;
        if let EventDetails::StockLimited(stock) = &mut event.details {
            stock.stock_quantity = Some(stock.stock_quantity.unwrap_or(0) + quantity);
        }
        Ok(())
    }

    async fn lock_form(&mut self, event_id: Uuid) -> Result<bool> {
        let event = self.staged.event_mut(event_id)?;
        match &mut event.details {
            EventDetails::SeatLimited(seat) if !seat.form_locked => {
                seat.form_locked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_registration_by_pair(
        &mut self,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<Registration>> {
        Ok(self.staged.registration_by_pair(event_id, participant_id).cloned())
    }

    async fn lock_registration(&mut self, id: Uuid) -> Result<Option<Registration>> {
        Ok(self.staged.registrations.get(&id).cloned())
    }

    async fn write_admission(&mut self, registration: &Registration) -> Result<Registration> {
        if let Some(existing) = self
            .staged
            .registration_by_pair(registration.event_id, registration.participant_id)
        {
            if existing.is_active() || existing.id != registration.id {
                return Err(EventPassError::DuplicateRegistration);
            }
        }

        if let Some(ticket_id) = &registration.ticket_id {
            let taken = self
                .staged
                .registrations
                .values()
                .any(|r| r.id != registration.id && r.ticket_id.as_ref() == Some(ticket_id));
            if taken {
                return Err(EventPassError::TicketCollision {
                    ticket_id: ticket_id.clone(),
                });
            }
        }

        self.staged
            .registrations
            .insert(registration.id, registration.clone());
        Ok(registration.clone())
    }

    async fn update_registration_status(
        &mut self,
        id: Uuid,
        status: RegistrationStatus,
        payment_status: PaymentStatus,
    ) -> Result<Registration> {
        let registration = self
            .staged
            .registrations
            .get_mut(&id)
            .ok_or_else(|| EventPassError::not_found("registration", id))?;
        registration.status = status;
        registration.payment_status = payment_status;
        registration.updated_at = Utc::now();
        Ok(registration.clone())
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = self.staged;
        Ok(())
    }
}
