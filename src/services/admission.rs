//! Registration admission control
//!
//! Every admission, cancellation and review runs inside one unit of work.
//! Capacity is taken with a conditional store mutation (seat counter or
//! stock decrement) and the pair uniqueness constraint settles same-pair
//! races, so no check-then-write window exists. Events are locked before
//! registrations.

use std::sync::Arc;

use uuid::Uuid;

use crate::database::{Store, UnitOfWork};
use crate::models::{
    AdmissionRequest, Eligibility, Event, EventDetails, EventStatus, PaymentStatus, Principal, Registration,
    RegistrationStatus, Role,
};
use crate::services::events::ensure_can_manage;
use crate::services::notification::{Notification, NotificationService};
use crate::services::ticket::{self, TicketIssuer};
use crate::state::payload::validate_payload;
use crate::utils::clock::Clock;
use crate::utils::errors::{EventPassError, Result};
use crate::utils::logging::{log_admission, log_admission_rejected, log_cancellation};

pub struct AdmissionService<S: Store> {
    store: Arc<S>,
    issuer: TicketIssuer,
    clock: Arc<dyn Clock>,
    notifications: NotificationService,
}

impl<S: Store> Clone for AdmissionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            issuer: self.issuer.clone(),
            clock: self.clock.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

fn is_eligible(principal: &Principal, eligibility: Eligibility) -> bool {
    match principal.participant_type {
        Some(participant_type) => participant_type.is_eligible_for(eligibility),
        None => eligibility == Eligibility::All,
    }
}

fn refunded(payment_status: PaymentStatus) -> PaymentStatus {
    match payment_status {
        PaymentStatus::Completed => PaymentStatus::Refunded,
        other => other,
    }
}

/// Explain why a conditional reservation matched nothing. The event is
/// re-read so a status change committed after the first read wins over the
/// capacity error.
async fn reservation_refused<T: UnitOfWork>(
    tx: &mut T,
    event_id: Uuid,
    exhausted: EventPassError,
) -> Result<EventPassError> {
    match tx.find_event(event_id).await? {
        Some(event) if event.status != EventStatus::Published => Ok(EventPassError::RegistrationUnavailable {
            status: event.status.to_string(),
        }),
        Some(_) => Ok(exhausted),
        None => Ok(EventPassError::not_found("event", event_id)),
    }
}

/// Give back what an active registration holds; returns the units released
async fn release_capacity<T: UnitOfWork>(tx: &mut T, event: &Event, registration: &Registration) -> Result<i32> {
    match &event.details {
        EventDetails::SeatLimited(_) => {
            tx.release_seat(event.id).await?;
            Ok(1)
        }
        EventDetails::StockLimited(_) => {
            tx.restore_stock(event.id, registration.quantity).await?;
            Ok(registration.quantity)
        }
    }
}

impl<S: Store> AdmissionService<S> {
    pub fn new(store: Arc<S>, issuer: TicketIssuer, clock: Arc<dyn Clock>, notifications: NotificationService) -> Self {
        Self {
            store,
            issuer,
            clock,
            notifications,
        }
    }

    /// Register `principal` for an event or buy stock from it
    pub async fn admit(&self, event_id: Uuid, principal: &Principal, request: AdmissionRequest) -> Result<Registration> {
        let result = self.try_admit(event_id, principal, request).await;
        match &result {
            Ok(registration) => log_admission(
                registration.id,
                event_id,
                principal.id,
                registration.ticket_id.as_deref().unwrap_or_default(),
                registration.quantity,
            ),
            Err(e) => log_admission_rejected(event_id, principal.id, e),
        }
        result
    }

    async fn try_admit(&self, event_id: Uuid, principal: &Principal, request: AdmissionRequest) -> Result<Registration> {
        if principal.role != Role::Participant {
            return Err(EventPassError::PermissionDenied(
                "Only participants can register for events".to_string(),
            ));
        }
        if request.quantity < 1 {
            return Err(EventPassError::InvalidInput("Quantity must be at least 1".to_string()));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let event = tx
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("event", event_id))?;

        if event.status != EventStatus::Published {
            return Err(EventPassError::RegistrationUnavailable {
                status: event.status.to_string(),
            });
        }
        if !is_eligible(principal, event.eligibility) {
            return Err(EventPassError::IneligibleParticipant);
        }
        if now > event.registration_deadline {
            return Err(EventPassError::DeadlinePassed);
        }

        let existing = tx.find_registration_by_pair(event_id, principal.id).await?;
        if existing.as_ref().is_some_and(Registration::is_active) {
            return Err(EventPassError::DuplicateRegistration);
        }

        validate_payload(&event, &request)?;

        let (quantity, responses, selections) = match &event.details {
            EventDetails::SeatLimited(_) => {
                if !tx.reserve_seat(event_id).await? {
                    return Err(reservation_refused(&mut tx, event_id, EventPassError::CapacityReached).await?);
                }
                tx.lock_form(event_id).await?;
                (1, request.responses, None)
            }
            EventDetails::StockLimited(stock) => {
                if request.quantity > stock.purchase_limit {
                    return Err(EventPassError::PurchaseLimitExceeded {
                        requested: request.quantity,
                        limit: stock.purchase_limit,
                    });
                }
                if !tx.reserve_stock(event_id, request.quantity).await? {
                    return Err(reservation_refused(&mut tx, event_id, EventPassError::StockExhausted).await?);
                }
                (request.quantity, Vec::new(), request.selections)
            }
        };

        // A Cancelled/Rejected record for the pair is reused in place
        let registration_id = existing.map(|r| r.id).unwrap_or_else(Uuid::new_v4);
        let issued = self.issuer.issue(&event, principal, registration_id, now)?;

        let registration = Registration {
            id: registration_id,
            event_id,
            participant_id: principal.id,
            status: RegistrationStatus::Registered,
            payment_status: PaymentStatus::for_unit_price(event.details.unit_price()),
            quantity,
            responses,
            selections,
            ticket_id: Some(issued.ticket_id),
            ticket_code: Some(issued.code),
            ticket_qr_data_url: Some(issued.qr_data_url),
            ticket_snapshot: Some(issued.snapshot),
            confirmation_email_sent: false,
            created_at: now,
            updated_at: now,
        };

        let stored = tx.write_admission(&registration).await?;
        tx.commit().await?;

        let reference_url = self.ticket_reference_url(&stored).unwrap_or_default();
        self.notifications.notify(Notification::TicketConfirmation {
            registration: stored.clone(),
            event,
            reference_url,
        });

        Ok(stored)
    }

    /// Find the event a registration belongs to. Runs before the unit of
    /// work opens; the event id never changes once written.
    async fn locate(&self, registration_id: Uuid) -> Result<Registration> {
        self.store
            .find_registration(registration_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("registration", registration_id))
    }

    /// Lock the event, then the registration
    async fn lock_pair(tx: &mut S::Tx, event_id: Uuid, registration_id: Uuid) -> Result<(Event, Registration)> {
        let event = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("event", event_id))?;
        let registration = tx
            .lock_registration(registration_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("registration", registration_id))?;

        Ok((event, registration))
    }

    /// Cancel the participant's own registration, restoring its capacity
    pub async fn cancel(&self, registration_id: Uuid, principal: &Principal) -> Result<Registration> {
        let located = self.locate(registration_id).await?;
        if located.participant_id != principal.id {
            return Err(EventPassError::not_found("registration", registration_id));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let (event, registration) = Self::lock_pair(&mut tx, located.event_id, registration_id).await?;

        if registration.status == RegistrationStatus::Cancelled {
            return Err(EventPassError::AlreadyCancelled);
        }
        if now > event.event_start_date {
            return Err(EventPassError::EventStarted);
        }

        let restored = if registration.is_active() {
            release_capacity(&mut tx, &event, &registration).await?
        } else {
            0
        };

        let cancelled = tx
            .update_registration_status(
                registration_id,
                RegistrationStatus::Cancelled,
                refunded(registration.payment_status),
            )
            .await?;
        tx.commit().await?;

        log_cancellation(registration_id, event.id, restored);
        Ok(cancelled)
    }

    /// Organizer review: mark a Registered entry Attended, or reject a
    /// Registered/Waitlisted one and release what it held
    pub async fn set_registration_status(
        &self,
        principal: &Principal,
        registration_id: Uuid,
        status: RegistrationStatus,
    ) -> Result<Registration> {
        let located = self.locate(registration_id).await?;

        let mut tx = self.store.begin().await?;
        let (event, registration) = Self::lock_pair(&mut tx, located.event_id, registration_id).await?;
        ensure_can_manage(&event, principal)?;

        let from = registration.status;
        let payment_status = match (from, status) {
            (RegistrationStatus::Registered, RegistrationStatus::Attended) => registration.payment_status,
            (RegistrationStatus::Registered | RegistrationStatus::Waitlisted, RegistrationStatus::Rejected) => {
                release_capacity(&mut tx, &event, &registration).await?;
                refunded(registration.payment_status)
            }
            _ => {
                return Err(EventPassError::InvalidTransition {
                    from: from.to_string(),
                    to: status.to_string(),
                })
            }
        };

        let updated = tx
            .update_registration_status(registration_id, status, payment_status)
            .await?;
        tx.commit().await?;

        tracing::info!(
            registration_id = %registration_id,
            event_id = %event.id,
            from = %from,
            to = %status,
            "Registration status changed"
        );
        Ok(updated)
    }

    /// Check a scanned ticket code against the stored registration
    pub async fn verify_ticket(&self, code: &str) -> Result<Registration> {
        let payload = ticket::decode(code)?;
        let registration = self
            .store
            .find_registration_by_ticket(&payload.ticket_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("registration", payload.registration_id))?;

        let matches = registration.id == payload.registration_id
            && registration.event_id == payload.event_id
            && registration.participant_id == payload.participant_id;
        if !matches {
            return Err(EventPassError::InvalidInput(
                "Ticket does not match its registration".to_string(),
            ));
        }
        if !registration.is_active() {
            return Err(EventPassError::InvalidInput(format!(
                "Ticket is no longer valid: registration is {}",
                registration.status
            )));
        }

        Ok(registration)
    }

    /// Registrations of an event, for its organizer
    pub async fn event_registrations(&self, principal: &Principal, event_id: Uuid) -> Result<Vec<Registration>> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("event", event_id))?;
        ensure_can_manage(&event, principal)?;

        self.store.list_event_registrations(event_id).await
    }

    /// The principal's own registrations, newest first
    pub async fn my_registrations(&self, principal: &Principal) -> Result<Vec<Registration>> {
        self.store.list_participant_registrations(principal.id).await
    }

    pub fn ticket_reference_url(&self, registration: &Registration) -> Option<String> {
        registration
            .ticket_id
            .as_deref()
            .map(|ticket_id| self.issuer.reference_url(ticket_id))
    }
}
