//! Checks an admission payload against the event it targets

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::models::event::{Event, EventDetails, FieldType, FormField, ItemDetails};
use crate::models::registration::{AdmissionRequest, FormResponse, Selections};
use crate::utils::errors::{EventPassError, Result};

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(checked) => !checked,
        _ => false,
    }
}

fn invalid(message: String) -> EventPassError {
    EventPassError::InvalidInput(message)
}

pub fn validate_responses(fields: &[FormField], responses: &[FormResponse]) -> Result<()> {
    let by_id: HashMap<_, _> = fields.iter().map(|f| (f.id, f)).collect();
    let mut answered = HashSet::new();

    for response in responses {
        let field = by_id
            .get(&response.field_id)
            .ok_or_else(|| invalid(format!("Unknown form field: {}", response.field_id)))?;

        if !answered.insert(response.field_id) {
            return Err(invalid(format!("Field '{}' answered more than once", field.label)));
        }

        if field.field_type == FieldType::Dropdown && !is_blank(&response.value) {
            let chosen = response.value.as_str().unwrap_or_default();
            if !field.options.iter().any(|o| o == chosen) {
                return Err(invalid(format!("'{}' is not an option of '{}'", chosen, field.label)));
            }
        }
    }

    let mut ordered: Vec<&FormField> = fields.iter().filter(|f| f.required).collect();
    ordered.sort_by_key(|f| f.order);
    for field in ordered {
        let answer = responses.iter().find(|r| r.field_id == field.id);
        if answer.map_or(true, |r| is_blank(&r.value)) {
            return Err(invalid(format!("Field '{}' is required", field.label)));
        }
    }

    Ok(())
}

fn check_choice(kind: &str, allowed: &[String], chosen: Option<&String>) -> Result<()> {
    match chosen {
        Some(value) if allowed.is_empty() => Err(invalid(format!("This item has no {} options, got '{}'", kind, value))),
        Some(value) if !allowed.contains(value) => Err(invalid(format!("'{}' is not an available {}", value, kind))),
        None if !allowed.is_empty() => Err(invalid(format!("Please select a {}", kind))),
        _ => Ok(()),
    }
}

pub fn validate_selections(item: &ItemDetails, selections: Option<&Selections>) -> Result<()> {
    let empty = Selections::default();
    let selections = selections.unwrap_or(&empty);
    check_choice("size", &item.sizes, selections.size.as_ref())?;
    check_choice("color", &item.colors, selections.color.as_ref())?;
    check_choice("variant", &item.variants, selections.variant.as_ref())?;
    Ok(())
}

/// Validate the participant-supplied part of an admission
pub fn validate_payload(event: &Event, request: &AdmissionRequest) -> Result<()> {
    match &event.details {
        EventDetails::SeatLimited(seat) => validate_responses(&seat.custom_form_fields, &request.responses),
        EventDetails::StockLimited(stock) => validate_selections(&stock.item_details, request.selections.as_ref()),
    }
}
