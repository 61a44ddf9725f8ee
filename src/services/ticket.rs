//! Ticket issuing
//!
//! A ticket id looks like `FEL-LOYW3V28-9C1A04BF`: the configured prefix, the
//! issue time in milliseconds rendered in upper-case base 36, and eight
//! upper-case hex characters of randomness. The ticket code is the URL-safe
//! base64 of the JSON verification payload; scanners read it from a QR code
//! carried as an SVG data URL.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TicketConfig;
use crate::models::{Event, Principal, TicketSnapshot};
use crate::utils::errors::{EventPassError, Result};
use crate::utils::helpers::{random_hex, to_base36};

const UNKNOWN_ORGANIZER: &str = "Unknown Organizer";
const QR_MIN_SIZE: u32 = 280;

/// Data bound into the scannable ticket code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    pub ticket_id: String,
    pub registration_id: Uuid,
    pub event_id: Uuid,
    pub participant_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub ticket_id: String,
    pub payload: TicketPayload,
    pub code: String,
    /// `data:image/svg+xml;base64,...` QR image of `code`
    pub qr_data_url: String,
    pub snapshot: TicketSnapshot,
}

#[derive(Debug, Clone)]
pub struct TicketIssuer {
    prefix: String,
    reference_base_url: String,
}

impl TicketIssuer {
    pub fn new(config: &TicketConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            reference_base_url: config.reference_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Generate a fresh ticket id for `issued_at`
    pub fn generate_ticket_id(&self, issued_at: DateTime<Utc>) -> String {
        let millis = issued_at.timestamp_millis().max(0) as u64;
        format!("{}-{}-{}", self.prefix, to_base36(millis), random_hex(4).to_uppercase())
    }

    /// Build the ticket for an admission. Pure apart from randomness;
    /// uniqueness is enforced when the registration is written.
    pub fn issue(
        &self,
        event: &Event,
        participant: &Principal,
        registration_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedTicket> {
        let ticket_id = self.generate_ticket_id(issued_at);
        let payload = TicketPayload {
            ticket_id: ticket_id.clone(),
            registration_id,
            event_id: event.id,
            participant_id: participant.id,
            issued_at,
        };
        let code = encode(&payload)?;
        let qr_data_url = qr_data_url(&code)?;

        let snapshot = TicketSnapshot {
            event_name: event.name.clone(),
            event_type: event.details.type_tag().to_string(),
            organizer_name: event
                .organizer_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ORGANIZER.to_string()),
            participant_name: participant.ticket_name(),
            participant_email: participant.email.clone(),
        };

        Ok(IssuedTicket {
            ticket_id,
            payload,
            code,
            qr_data_url,
            snapshot,
        })
    }

    /// Public link at which a ticket can be looked up
    pub fn reference_url(&self, ticket_id: &str) -> String {
        format!("{}/tickets/{}", self.reference_base_url, urlencoding::encode(ticket_id))
    }
}

pub fn encode(payload: &TicketPayload) -> Result<String> {
    let json = serde_json::to_vec(payload)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Render a ticket code as a QR image embedded in a data URL
pub fn qr_data_url(code: &str) -> Result<String> {
    let qr = QrCode::with_error_correction_level(code.as_bytes(), EcLevel::M)?;
    let image = qr
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}

/// Recover the payload from a scanned code
pub fn decode(code: &str) -> Result<TicketPayload> {
    let bytes = URL_SAFE_NO_PAD
        .decode(code.trim())
        .map_err(|e| EventPassError::InvalidInput(format!("Malformed ticket code: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| EventPassError::InvalidInput(format!("Malformed ticket payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{Eligibility, EventDetails, EventStatus, ItemDetails, StockLimited};
    use crate::models::ParticipantType;
    use chrono::TimeZone;
    use regex::Regex;

    fn issuer() -> TicketIssuer {
        TicketIssuer::new(&TicketConfig {
            prefix: "FEL".to_string(),
            reference_base_url: "https://tickets.example.org/".to_string(),
        })
    }

    fn merch_event(organizer_name: Option<&str>) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            organizer_name: organizer_name.map(str::to_string),
            name: "Fest Hoodie".to_string(),
            description: "Limited run".to_string(),
            eligibility: Eligibility::All,
            registration_deadline: now,
            event_start_date: now,
            event_end_date: now,
            status: EventStatus::Published,
            tags: Vec::new(),
            discord_webhook_url: None,
            details: EventDetails::StockLimited(StockLimited {
                price: Some(800),
                stock_quantity: Some(10),
                purchase_limit: 2,
                item_details: ItemDetails::default(),
            }),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_ticket_id_format() {
        let issued_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let id = issuer().generate_ticket_id(issued_at);
        assert!(id.starts_with("FEL-LOYW3V28-"));
        assert!(Regex::new(r"^FEL-[0-9A-Z]+-[0-9A-F]{8}$").unwrap().is_match(&id));
    }

    #[test]
    fn test_issue_binds_payload_and_snapshot() {
        let event = merch_event(None);
        let participant = Principal::participant(Uuid::new_v4(), ParticipantType::Iiit, "", "asha@example.org");
        let registration_id = Uuid::new_v4();

        let ticket = issuer().issue(&event, &participant, registration_id, Utc::now()).unwrap();

        let payload = decode(&ticket.code).unwrap();
        assert_eq!(payload, ticket.payload);
        assert_eq!(payload.ticket_id, ticket.ticket_id);
        assert_eq!(payload.registration_id, registration_id);
        assert_eq!(payload.participant_id, participant.id);

        assert_eq!(ticket.snapshot.event_type, "StockLimited");
        assert_eq!(ticket.snapshot.organizer_name, "Unknown Organizer");
        assert_eq!(ticket.snapshot.participant_name, "asha@example.org");
    }

    #[test]
    fn test_code_is_url_safe() {
        let event = merch_event(Some("Cultural Council"));
        let participant = Principal::participant(Uuid::new_v4(), ParticipantType::NonIiit, "Ravi", "ravi@example.org");
        let ticket = issuer().issue(&event, &participant, Uuid::new_v4(), Utc::now()).unwrap();
        assert!(!ticket.code.contains('+') && !ticket.code.contains('/') && !ticket.code.contains('='));
    }

    #[test]
    fn test_ticket_carries_qr_image_of_code() {
        let event = merch_event(Some("Cultural Council"));
        let participant = Principal::participant(Uuid::new_v4(), ParticipantType::Iiit, "Asha", "asha@example.org");
        let ticket = issuer().issue(&event, &participant, Uuid::new_v4(), Utc::now()).unwrap();

        let encoded = ticket.qr_data_url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));

        // same code, same image
        assert_eq!(qr_data_url(&ticket.code).unwrap(), ticket.qr_data_url);
        assert_ne!(qr_data_url("FEL-OTHER").unwrap(), ticket.qr_data_url);
    }

    #[test]
    fn test_oversized_code_is_a_render_error() {
        let code = "A".repeat(8000);
        assert!(matches!(qr_data_url(&code), Err(EventPassError::TicketRender(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not base64 !!"), Err(EventPassError::InvalidInput(_))));
        assert!(matches!(decode(&URL_SAFE_NO_PAD.encode(b"{}")), Err(EventPassError::InvalidInput(_))));
    }

    #[test]
    fn test_reference_url_encodes_ticket_id() {
        assert_eq!(
            issuer().reference_url("FEL-ABC-12 34"),
            "https://tickets.example.org/tickets/FEL-ABC-12%2034"
        );
    }
}
