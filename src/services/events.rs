//! Organizer-facing event management

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::config::validation::is_valid_discord_webhook_url;
use crate::database::{Store, UnitOfWork};
use crate::models::event::{validate_schedule, EventDetails, ItemDetails, SeatLimited, StockLimited};
use crate::models::{CreateEventDetails, CreateEventRequest, Event, EventStatus, Principal, Role, UpdateEventRequest};
use crate::services::notification::{Notification, NotificationService};
use crate::state::lifecycle::{apply_update, ensure_transition, form_field_problems, validate_for_publish};
use crate::utils::clock::Clock;
use crate::utils::errors::{EventPassError, Result};
use crate::utils::helpers::normalize_whitespace;
use crate::utils::logging::log_event_action;

/// Owner or admin may manage an event
pub(crate) fn ensure_can_manage(event: &Event, principal: &Principal) -> Result<()> {
    if principal.is_admin() || event.organizer_id == principal.id {
        Ok(())
    } else {
        Err(EventPassError::PermissionDenied(
            "Only the organizing club can manage this event".to_string(),
        ))
    }
}

fn build_details(details: CreateEventDetails) -> Result<EventDetails> {
    match details {
        CreateEventDetails::SeatLimited {
            registration_limit,
            registration_fee,
            custom_form_fields,
        } => {
            if matches!(registration_limit, Some(limit) if limit <= 0) {
                return Err(EventPassError::InvalidInput("Registration limit must be positive".to_string()));
            }
            if registration_fee < 0 {
                return Err(EventPassError::InvalidInput("Registration fee cannot be negative".to_string()));
            }
            let problems = form_field_problems(&custom_form_fields);
            if !problems.is_empty() {
                return Err(EventPassError::InvalidInput(problems.join("; ")));
            }

            Ok(EventDetails::SeatLimited(SeatLimited {
                registration_limit,
                registration_fee,
                form_locked: false,
                custom_form_fields,
                seats_taken: 0,
            }))
        }
        CreateEventDetails::StockLimited {
            price,
            stock_quantity,
            purchase_limit,
            item_details,
        } => {
            if matches!(price, Some(p) if p < 0) {
                return Err(EventPassError::InvalidInput("Price cannot be negative".to_string()));
            }
            if matches!(stock_quantity, Some(q) if q < 0) {
                return Err(EventPassError::InvalidInput("Stock quantity cannot be negative".to_string()));
            }
            let purchase_limit = purchase_limit.unwrap_or(1);
            if purchase_limit < 1 {
                return Err(EventPassError::InvalidInput("Purchase limit must be at least 1".to_string()));
            }

            Ok(EventDetails::StockLimited(StockLimited {
                price,
                stock_quantity,
                purchase_limit,
                item_details: clean_item_details(item_details),
            }))
        }
    }
}

/// The organizer's webhook, if set, must be a Discord webhook URL
fn organizer_webhook(principal: &Principal) -> Result<Option<String>> {
    let Some(url) = principal.discord_webhook_url.as_deref().map(str::trim) else {
        return Ok(None);
    };
    if url.is_empty() {
        return Ok(None);
    }
    if !is_valid_discord_webhook_url(url) {
        return Err(EventPassError::InvalidInput(
            "Invalid Discord webhook URL in organizer profile".to_string(),
        ));
    }
    Ok(Some(url.to_string()))
}

fn clean_item_details(details: ItemDetails) -> ItemDetails {
    let clean = |values: Vec<String>| -> Vec<String> {
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    };
    ItemDetails {
        sizes: clean(details.sizes),
        colors: clean(details.colors),
        variants: clean(details.variants),
    }
}

pub struct EventService<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    notifications: NotificationService,
}

impl<S: Store> Clone for EventService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

impl<S: Store> EventService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, notifications: NotificationService) -> Self {
        Self {
            store,
            clock,
            notifications,
        }
    }

    /// Create a Draft event owned by `principal`
    pub async fn create(&self, principal: &Principal, request: CreateEventRequest) -> Result<Event> {
        if principal.role != Role::Organizer {
            return Err(EventPassError::PermissionDenied("Only organizers can create events".to_string()));
        }
        validate_schedule(request.registration_deadline, request.event_start_date, request.event_end_date)?;
        let discord_webhook_url = organizer_webhook(principal)?;

        let now = self.clock.now();
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: principal.id,
            organizer_name: Some(principal.ticket_name()),
            name: normalize_whitespace(&request.name),
            description: request.description.trim().to_string(),
            eligibility: request.eligibility,
            registration_deadline: request.registration_deadline,
            event_start_date: request.event_start_date,
            event_end_date: request.event_end_date,
            status: EventStatus::Draft,
            tags: request
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            discord_webhook_url,
            details: build_details(request.details)?,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_event(&event).await?;
        tx.commit().await?;

        log_event_action(event.id, "create", principal.id, Some(event.details.type_tag()));
        Ok(event)
    }

    pub async fn get(&self, event_id: Uuid) -> Result<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("event", event_id))
    }

    /// Edit fields within what the event's status allows
    pub async fn update(&self, principal: &Principal, event_id: Uuid, request: UpdateEventRequest) -> Result<Event> {
        let mut tx = self.store.begin().await?;
        let event = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("event", event_id))?;
        ensure_can_manage(&event, principal)?;

        let touched = request.touched_fields();
        let edited = apply_update(&event, &request)?;
        if touched.is_empty() {
            return Ok(edited);
        }

        let stored = tx.update_event(&edited).await?;
        tx.commit().await?;

        log_event_action(event_id, "update", principal.id, Some(touched.join(",").as_str()));
        Ok(stored)
    }

    /// Move the event through its lifecycle. Publishing a Draft runs the
    /// completeness check and queues the Discord announcement.
    pub async fn change_status(&self, principal: &Principal, event_id: Uuid, status: EventStatus) -> Result<Event> {
        let mut tx = self.store.begin().await?;
        let mut event = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("event", event_id))?;
        ensure_can_manage(&event, principal)?;

        let from = event.status;
        ensure_transition(from, status)?;
        if from == status {
            return Ok(event);
        }

        let publishing = from == EventStatus::Draft && status == EventStatus::Published;
        if publishing {
            validate_for_publish(&event)?;
        }

        event.status = status;
        let stored = tx.update_event(&event).await?;
        tx.commit().await?;

        info!(event_id = %event_id, from = %from, to = %status, "Event status changed");
        log_event_action(event_id, "change_status", principal.id, Some(status.as_str()));

        if publishing {
            self.notifications.notify(Notification::EventPublished { event: stored.clone() });
        }
        Ok(stored)
    }

    /// Remove an event that no active registration refers to. Cancelled and
    /// Rejected registrations stay on record.
    pub async fn delete(&self, principal: &Principal, event_id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let event = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found("event", event_id))?;
        ensure_can_manage(&event, principal)?;

        let count = tx.count_active_registrations(event_id).await?;
        if count > 0 {
            return Err(EventPassError::HasRegistrations { count });
        }

        tx.delete_event(event_id).await?;
        tx.commit().await?;

        log_event_action(event_id, "delete", principal.id, None);
        Ok(())
    }
}
