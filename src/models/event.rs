//! Event model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::errors::EventPassError;

/// Lifecycle status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Draft,
    Published,
    Ongoing,
    Completed,
    Closed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "Draft",
            EventStatus::Published => "Published",
            EventStatus::Ongoing => "Ongoing",
            EventStatus::Completed => "Completed",
            EventStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = EventPassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(EventStatus::Draft),
            "Published" => Ok(EventStatus::Published),
            "Ongoing" => Ok(EventStatus::Ongoing),
            "Completed" => Ok(EventStatus::Completed),
            "Closed" => Ok(EventStatus::Closed),
            other => Err(EventPassError::InvalidInput(format!("Unknown event status: {}", other))),
        }
    }
}

/// Who may register for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Eligibility {
    Iiit,
    NonIiit,
    All,
}

impl Eligibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Iiit => "IIIT",
            Eligibility::NonIiit => "NON_IIIT",
            Eligibility::All => "ALL",
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Eligibility {
    type Err = EventPassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IIIT" => Ok(Eligibility::Iiit),
            "NON_IIIT" => Ok(Eligibility::NonIiit),
            "ALL" => Ok(Eligibility::All),
            other => Err(EventPassError::InvalidInput(format!("Unknown eligibility: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Dropdown,
    Checkbox,
    File,
}

/// One entry of a seat-limited event's registration form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: Uuid,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub variants: Vec<String>,
}

/// Capacity is bounded by admitted registrations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatLimited {
    pub registration_limit: Option<i32>,
    pub registration_fee: i64,
    pub form_locked: bool,
    pub custom_form_fields: Vec<FormField>,
    /// Number of registrations currently holding a seat
    pub seats_taken: i32,
}

/// Capacity is bounded by a decrementable inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLimited {
    pub price: Option<i64>,
    pub stock_quantity: Option<i32>,
    pub purchase_limit: i32,
    pub item_details: ItemDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum EventDetails {
    SeatLimited(SeatLimited),
    StockLimited(StockLimited),
}

impl EventDetails {
    /// Discriminator persisted alongside the row
    pub fn type_tag(&self) -> &'static str {
        match self {
            EventDetails::SeatLimited(_) => "SeatLimited",
            EventDetails::StockLimited(_) => "StockLimited",
        }
    }

    /// Price of a single unit or seat, zero when not set
    pub fn unit_price(&self) -> i64 {
        match self {
            EventDetails::SeatLimited(seat) => seat.registration_fee,
            EventDetails::StockLimited(stock) => stock.price.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub organizer_name: Option<String>,
    pub name: String,
    pub description: String,
    pub eligibility: Eligibility,
    pub registration_deadline: DateTime<Utc>,
    pub event_start_date: DateTime<Utc>,
    pub event_end_date: DateTime<Utc>,
    pub status: EventStatus,
    pub tags: Vec<String>,
    /// The organizer's own announcement webhook, taken from their profile
    /// when the event was created. Never serialized: the token is a secret.
    #[serde(default, skip_serializing)]
    pub discord_webhook_url: Option<String>,
    pub details: EventDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn seat_limited(&self) -> Option<&SeatLimited> {
        match &self.details {
            EventDetails::SeatLimited(seat) => Some(seat),
            EventDetails::StockLimited(_) => None,
        }
    }

    pub fn stock_limited(&self) -> Option<&StockLimited> {
        match &self.details {
            EventDetails::StockLimited(stock) => Some(stock),
            EventDetails::SeatLimited(_) => None,
        }
    }

    /// Whether the schedule respects deadline <= start <= end
    pub fn has_valid_schedule(&self) -> bool {
        validate_schedule(self.registration_deadline, self.event_start_date, self.event_end_date).is_ok()
    }
}

/// Check the ordering invariant of an event's three dates
pub fn validate_schedule(
    registration_deadline: DateTime<Utc>,
    event_start_date: DateTime<Utc>,
    event_end_date: DateTime<Utc>,
) -> Result<(), EventPassError> {
    if registration_deadline > event_start_date {
        return Err(EventPassError::InvalidInput(
            "Registration deadline must not be after the event start".to_string(),
        ));
    }
    if event_start_date > event_end_date {
        return Err(EventPassError::InvalidInput(
            "Event start must not be after the event end".to_string(),
        ));
    }
    Ok(())
}

/// Variant-specific part of a creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum CreateEventDetails {
    SeatLimited {
        registration_limit: Option<i32>,
        #[serde(default)]
        registration_fee: i64,
        #[serde(default)]
        custom_form_fields: Vec<FormField>,
    },
    StockLimited {
        price: Option<i64>,
        stock_quantity: Option<i32>,
        purchase_limit: Option<i32>,
        #[serde(default)]
        item_details: ItemDetails,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    pub eligibility: Eligibility,
    pub registration_deadline: DateTime<Utc>,
    pub event_start_date: DateTime<Utc>,
    pub event_end_date: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub details: CreateEventDetails,
}

/// Partial update of an event; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub eligibility: Option<Eligibility>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub event_start_date: Option<DateTime<Utc>>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub registration_limit: Option<i32>,
    pub registration_fee: Option<i64>,
    pub custom_form_fields: Option<Vec<FormField>>,
    pub price: Option<i64>,
    pub stock_quantity: Option<i32>,
    pub purchase_limit: Option<i32>,
    pub item_details: Option<ItemDetails>,
}

impl UpdateEventRequest {
    /// Names of the fields this request touches
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.eligibility.is_some() {
            fields.push("eligibility");
        }
        if self.registration_deadline.is_some() {
            fields.push("registration_deadline");
        }
        if self.event_start_date.is_some() {
            fields.push("event_start_date");
        }
        if self.event_end_date.is_some() {
            fields.push("event_end_date");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        if self.registration_limit.is_some() {
            fields.push("registration_limit");
        }
        if self.registration_fee.is_some() {
            fields.push("registration_fee");
        }
        if self.custom_form_fields.is_some() {
            fields.push("custom_form_fields");
        }
        if self.price.is_some() {
            fields.push("price");
        }
        if self.stock_quantity.is_some() {
            fields.push("stock_quantity");
        }
        if self.purchase_limit.is_some() {
            fields.push("purchase_limit");
        }
        if self.item_details.is_some() {
            fields.push("item_details");
        }
        fields
    }
}
