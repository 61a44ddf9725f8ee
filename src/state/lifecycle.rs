//! Event lifecycle rules
//!
//! Which status transitions are legal, what an event needs before it can be
//! published, and which fields an organizer may still edit at each status.

use std::collections::HashSet;

use crate::models::event::{validate_schedule, Event, EventDetails, EventStatus, FieldType, FormField};
use crate::models::UpdateEventRequest;
use crate::utils::errors::{EventPassError, Result};

/// Statuses reachable from `from`, including staying put
pub fn allowed_transitions(from: EventStatus) -> &'static [EventStatus] {
    use EventStatus::*;
    match from {
        Draft => &[Draft, Published, Closed],
        Published => &[Published, Ongoing, Closed],
        Ongoing => &[Ongoing, Completed, Closed],
        Completed => &[Completed, Closed],
        Closed => &[Closed],
    }
}

pub fn can_transition(from: EventStatus, to: EventStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

pub fn ensure_transition(from: EventStatus, to: EventStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(EventPassError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Problems with a form-field schema; empty when well-formed
pub fn form_field_problems(fields: &[FormField]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut ids = HashSet::new();
    let mut orders = HashSet::new();

    for field in fields {
        let label = field.label.trim();
        if label.is_empty() {
            problems.push(format!("Form field {} has an empty label", field.id));
        }
        if !ids.insert(field.id) {
            problems.push(format!("Form field id {} is used more than once", field.id));
        }
        if !orders.insert(field.order) {
            problems.push(format!("Form field order {} is used more than once", field.order));
        }
        if field.field_type == FieldType::Dropdown && field.options.iter().all(|o| o.trim().is_empty()) {
            problems.push(format!("Dropdown field '{}' has no options", label));
        }
    }

    problems
}

/// Every reason `event` cannot be published yet
pub fn publish_problems(event: &Event) -> Vec<String> {
    let mut problems = Vec::new();

    if event.name.trim().is_empty() {
        problems.push("Name is required".to_string());
    }
    if event.description.trim().is_empty() {
        problems.push("Description is required".to_string());
    }
    if let Err(e) = validate_schedule(event.registration_deadline, event.event_start_date, event.event_end_date) {
        problems.push(e.to_string());
    }

    match &event.details {
        EventDetails::SeatLimited(seat) => {
            match seat.registration_limit {
                Some(limit) if limit > 0 => {}
                _ => problems.push("Registration limit must be a positive number".to_string()),
            }
            if seat.custom_form_fields.is_empty() {
                problems.push("At least one registration form field is required".to_string());
            }
            problems.extend(form_field_problems(&seat.custom_form_fields));
        }
        EventDetails::StockLimited(stock) => {
            if stock.price.is_none() {
                problems.push("Price is required".to_string());
            }
            if stock.stock_quantity.is_none() {
                problems.push("Stock quantity is required".to_string());
            }
            if stock.purchase_limit < 1 {
                problems.push("Purchase limit must be at least 1".to_string());
            }
        }
    }

    problems
}

pub fn validate_for_publish(event: &Event) -> Result<()> {
    let reasons = publish_problems(event);
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(EventPassError::PublishValidationFailed { reasons })
    }
}

fn wrong_variant(field: &str, event: &Event) -> EventPassError {
    EventPassError::InvalidInput(format!(
        "Field '{}' does not apply to {} events",
        field,
        event.details.type_tag()
    ))
}

fn not_editable(field: &str, status: EventStatus) -> EventPassError {
    EventPassError::FieldNotEditable {
        field: field.to_string(),
        status: status.to_string(),
    }
}

/// Reject request fields that belong to the other event variant
fn check_variant_fields(event: &Event, request: &UpdateEventRequest) -> Result<()> {
    match &event.details {
        EventDetails::SeatLimited(_) => {
            let stock_fields = [
                ("price", request.price.is_some()),
                ("stock_quantity", request.stock_quantity.is_some()),
                ("purchase_limit", request.purchase_limit.is_some()),
                ("item_details", request.item_details.is_some()),
            ];
            if let Some((field, _)) = stock_fields.iter().find(|(_, set)| *set) {
                return Err(wrong_variant(field, event));
            }
        }
        EventDetails::StockLimited(_) => {
            let seat_fields = [
                ("registration_limit", request.registration_limit.is_some()),
                ("registration_fee", request.registration_fee.is_some()),
                ("custom_form_fields", request.custom_form_fields.is_some()),
            ];
            if let Some((field, _)) = seat_fields.iter().find(|(_, set)| *set) {
                return Err(wrong_variant(field, event));
            }
        }
    }
    Ok(())
}

fn check_values(request: &UpdateEventRequest) -> Result<()> {
    if matches!(request.registration_limit, Some(limit) if limit <= 0) {
        return Err(EventPassError::InvalidInput("Registration limit must be positive".to_string()));
    }
    if matches!(request.registration_fee, Some(fee) if fee < 0) {
        return Err(EventPassError::InvalidInput("Registration fee cannot be negative".to_string()));
    }
    if matches!(request.price, Some(price) if price < 0) {
        return Err(EventPassError::InvalidInput("Price cannot be negative".to_string()));
    }
    if matches!(request.stock_quantity, Some(stock) if stock < 0) {
        return Err(EventPassError::InvalidInput("Stock quantity cannot be negative".to_string()));
    }
    if matches!(request.purchase_limit, Some(limit) if limit < 1) {
        return Err(EventPassError::InvalidInput("Purchase limit must be at least 1".to_string()));
    }
    if let Some(fields) = &request.custom_form_fields {
        let problems = form_field_problems(fields);
        if !problems.is_empty() {
            return Err(EventPassError::InvalidInput(problems.join("; ")));
        }
    }
    Ok(())
}

/// Produce the edited event, enforcing per-status editability.
///
/// Capacity counters and the form lock are carried over untouched; the
/// store never writes them through an update either.
pub fn apply_update(event: &Event, request: &UpdateEventRequest) -> Result<Event> {
    let touched = request.touched_fields();
    if touched.is_empty() {
        return Ok(event.clone());
    }

    check_variant_fields(event, request)?;
    check_values(request)?;

    let mut updated = event.clone();

    match event.status {
        EventStatus::Draft => {
            if let Some(name) = &request.name {
                updated.name = name.clone();
            }
            if let Some(description) = &request.description {
                updated.description = description.clone();
            }
            if let Some(eligibility) = request.eligibility {
                updated.eligibility = eligibility;
            }
            if let Some(deadline) = request.registration_deadline {
                updated.registration_deadline = deadline;
            }
            if let Some(start) = request.event_start_date {
                updated.event_start_date = start;
            }
            if let Some(end) = request.event_end_date {
                updated.event_end_date = end;
            }
            if let Some(tags) = &request.tags {
                updated.tags = tags.clone();
            }

            match &mut updated.details {
                EventDetails::SeatLimited(seat) => {
                    if let Some(fields) = &request.custom_form_fields {
                        if seat.form_locked {
                            return Err(EventPassError::FormLocked);
                        }
                        seat.custom_form_fields = fields.clone();
                    }
                    if let Some(limit) = request.registration_limit {
                        seat.registration_limit = Some(limit);
                    }
                    if let Some(fee) = request.registration_fee {
                        seat.registration_fee = fee;
                    }
                }
                EventDetails::StockLimited(stock) => {
                    if let Some(price) = request.price {
                        stock.price = Some(price);
                    }
                    if let Some(quantity) = request.stock_quantity {
                        stock.stock_quantity = Some(quantity);
                    }
                    if let Some(limit) = request.purchase_limit {
                        stock.purchase_limit = limit;
                    }
                    if let Some(item_details) = &request.item_details {
                        stock.item_details = item_details.clone();
                    }
                }
            }
        }
        EventStatus::Published => {
            const EDITABLE: [&str; 3] = ["description", "registration_deadline", "registration_limit"];
            if let Some(field) = touched.iter().find(|f| !EDITABLE.contains(*f)) {
                return Err(not_editable(field, event.status));
            }

            if let Some(description) = &request.description {
                updated.description = description.clone();
            }
            if let Some(deadline) = request.registration_deadline {
                if deadline < event.registration_deadline {
                    return Err(EventPassError::DeadlineExtensionRequired);
                }
                updated.registration_deadline = deadline;
            }
            if let (Some(limit), EventDetails::SeatLimited(seat)) = (request.registration_limit, &mut updated.details) {
                if matches!(seat.registration_limit, Some(current) if limit < current) {
                    return Err(EventPassError::LimitIncreaseRequired);
                }
                seat.registration_limit = Some(limit);
            }
        }
        status => {
            return Err(not_editable(touched[0], status));
        }
    }

    validate_schedule(
        updated.registration_deadline,
        updated.event_start_date,
        updated.event_end_date,
    )?;

    Ok(updated)
}
