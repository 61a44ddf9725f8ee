//! Registration model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::errors::EventPassError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Registered,
    Waitlisted,
    Attended,
    Cancelled,
    Rejected,
}

impl RegistrationStatus {
    /// Statuses that hold capacity
    pub const ACTIVE: [RegistrationStatus; 3] = [
        RegistrationStatus::Registered,
        RegistrationStatus::Waitlisted,
        RegistrationStatus::Attended,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "Registered",
            RegistrationStatus::Waitlisted => "Waitlisted",
            RegistrationStatus::Attended => "Attended",
            RegistrationStatus::Cancelled => "Cancelled",
            RegistrationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = EventPassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Registered" => Ok(RegistrationStatus::Registered),
            "Waitlisted" => Ok(RegistrationStatus::Waitlisted),
            "Attended" => Ok(RegistrationStatus::Attended),
            "Cancelled" => Ok(RegistrationStatus::Cancelled),
            "Rejected" => Ok(RegistrationStatus::Rejected),
            other => Err(EventPassError::InvalidInput(format!("Unknown registration status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    #[serde(rename = "N/A")]
    NotApplicable,
    Refunded,
}

impl PaymentStatus {
    /// Payment status recorded at admission time
    pub fn for_unit_price(unit_price: i64) -> Self {
        if unit_price > 0 {
            PaymentStatus::Completed
        } else {
            PaymentStatus::NotApplicable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::NotApplicable => "N/A",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = EventPassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Completed" => Ok(PaymentStatus::Completed),
            "N/A" => Ok(PaymentStatus::NotApplicable),
            "Refunded" => Ok(PaymentStatus::Refunded),
            other => Err(EventPassError::InvalidInput(format!("Unknown payment status: {}", other))),
        }
    }
}

/// Answer to one custom form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormResponse {
    pub field_id: Uuid,
    pub label: String,
    pub value: serde_json::Value,
}

/// Variant choices for a merchandise purchase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selections {
    pub size: Option<String>,
    pub color: Option<String>,
    pub variant: Option<String>,
}

/// Display fields copied onto the registration when its ticket is issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    pub event_name: String,
    pub event_type: String,
    pub organizer_name: String,
    pub participant_name: String,
    pub participant_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub participant_id: Uuid,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    pub quantity: i32,
    pub responses: Vec<FormResponse>,
    pub selections: Option<Selections>,
    pub ticket_id: Option<String>,
    pub ticket_code: Option<String>,
    /// QR image of `ticket_code` as a data URL
    pub ticket_qr_data_url: Option<String>,
    pub ticket_snapshot: Option<TicketSnapshot>,
    pub confirmation_email_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Participant-supplied part of an admission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRequest {
    #[serde(default)]
    pub responses: Vec<FormResponse>,
    pub selections: Option<Selections>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

impl Default for AdmissionRequest {
    fn default() -> Self {
        Self {
            responses: Vec::new(),
            selections: None,
            quantity: default_quantity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_set() {
        assert!(RegistrationStatus::Registered.is_active());
        assert!(RegistrationStatus::Waitlisted.is_active());
        assert!(RegistrationStatus::Attended.is_active());
        assert!(!RegistrationStatus::Cancelled.is_active());
        assert!(!RegistrationStatus::Rejected.is_active());
    }

    #[test]
    fn test_payment_status_for_price() {
        assert_eq!(PaymentStatus::for_unit_price(0), PaymentStatus::NotApplicable);
        assert_eq!(PaymentStatus::for_unit_price(250), PaymentStatus::Completed);
        assert_eq!(serde_json::to_string(&PaymentStatus::NotApplicable).unwrap(), "\"N/A\"");
        assert_eq!("N/A".parse::<PaymentStatus>().unwrap(), PaymentStatus::NotApplicable);
    }

    #[test]
    fn test_admission_request_defaults_quantity() {
        let request: AdmissionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.quantity, 1);
        assert!(request.responses.is_empty());
    }
}
