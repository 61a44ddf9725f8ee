//! Request and principal fixtures

use chrono::Duration;
use serde_json::json;
use uuid::Uuid;
use EventPass::models::{
    AdmissionRequest, CreateEventDetails, CreateEventRequest, Eligibility, Event, FieldType, FormField,
    FormResponse, ItemDetails, ParticipantType, Principal, Selections,
};

use super::base_time;

pub fn organizer(name: &str) -> Principal {
    Principal::organizer(Uuid::new_v4(), name, &format!("{}@clubs.example.org", name.to_lowercase().replace(' ', ".")))
}

pub fn participant(name: &str) -> Principal {
    Principal::participant(
        Uuid::new_v4(),
        ParticipantType::Iiit,
        name,
        &format!("{}@students.example.org", name.to_lowercase()),
    )
}

pub fn outsider(name: &str) -> Principal {
    Principal::participant(
        Uuid::new_v4(),
        ParticipantType::NonIiit,
        name,
        &format!("{}@example.com", name.to_lowercase()),
    )
}

pub fn form_field(label: &str, field_type: FieldType, required: bool, options: &[&str], order: i32) -> FormField {
    FormField {
        id: Uuid::new_v4(),
        label: label.to_string(),
        field_type,
        required,
        options: options.iter().map(|o| o.to_string()).collect(),
        order,
    }
}

fn schedule() -> (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) {
    let deadline = base_time() + Duration::days(7);
    (deadline, deadline + Duration::days(3), deadline + Duration::days(4))
}

pub fn seat_event_request(limit: i32, fee: i64) -> CreateEventRequest {
    let (deadline, start, end) = schedule();
    CreateEventRequest {
        name: "Robo Wars".to_string(),
        description: "Bot combat in the arena".to_string(),
        eligibility: Eligibility::All,
        registration_deadline: deadline,
        event_start_date: start,
        event_end_date: end,
        tags: vec!["tech".to_string()],
        details: CreateEventDetails::SeatLimited {
            registration_limit: Some(limit),
            registration_fee: fee,
            custom_form_fields: vec![
                form_field("Team name", FieldType::Text, true, &[], 1),
                form_field("Track", FieldType::Dropdown, false, &["Heavy", "Light"], 2),
            ],
        },
    }
}

pub fn stock_event_request(stock: Option<i32>, purchase_limit: i32) -> CreateEventRequest {
    let (deadline, start, end) = schedule();
    CreateEventRequest {
        name: "Fest Hoodie".to_string(),
        description: "Limited edition merchandise".to_string(),
        eligibility: Eligibility::All,
        registration_deadline: deadline,
        event_start_date: start,
        event_end_date: end,
        tags: vec!["merch".to_string()],
        details: CreateEventDetails::StockLimited {
            price: Some(900),
            stock_quantity: stock,
            purchase_limit: Some(purchase_limit),
            item_details: ItemDetails {
                sizes: vec!["S".to_string(), "M".to_string(), "L".to_string()],
                colors: Vec::new(),
                variants: Vec::new(),
            },
        },
    }
}

/// Answers every required field of a seat-limited event
pub fn form_answers(event: &Event) -> AdmissionRequest {
    let fields = event.seat_limited().map(|s| s.custom_form_fields.clone()).unwrap_or_default();
    AdmissionRequest {
        responses: fields
            .iter()
            .filter(|f| f.required)
            .map(|f| FormResponse {
                field_id: f.id,
                label: f.label.clone(),
                value: json!("Team Rocket"),
            })
            .collect(),
        selections: None,
        quantity: 1,
    }
}

pub fn purchase(quantity: i32, size: &str) -> AdmissionRequest {
    AdmissionRequest {
        responses: Vec::new(),
        selections: Some(Selections {
            size: Some(size.to_string()),
            color: None,
            variant: None,
        }),
        quantity,
    }
}
