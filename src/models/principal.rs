//! Authenticated principal model
//!
//! Identity facts handed over by the authentication layer. The core never
//! creates or verifies these, it only reads them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::Eligibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Participant,
    Organizer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    Iiit,
    NonIiit,
}

impl ParticipantType {
    /// Whether this participant class satisfies an event's eligibility rule
    pub fn is_eligible_for(&self, eligibility: Eligibility) -> bool {
        match (eligibility, self) {
            (Eligibility::All, _) => true,
            (Eligibility::Iiit, ParticipantType::Iiit) => true,
            (Eligibility::NonIiit, ParticipantType::NonIiit) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    /// Present when `role` is `Participant`
    pub participant_type: Option<ParticipantType>,
    pub display_name: String,
    pub email: String,
    /// Organizer profile setting: where their publications are announced
    #[serde(default)]
    pub discord_webhook_url: Option<String>,
}

impl Principal {
    pub fn participant(id: Uuid, participant_type: ParticipantType, display_name: &str, email: &str) -> Self {
        Self {
            id,
            role: Role::Participant,
            participant_type: Some(participant_type),
            display_name: display_name.to_string(),
            email: email.to_string(),
            discord_webhook_url: None,
        }
    }

    pub fn organizer(id: Uuid, display_name: &str, email: &str) -> Self {
        Self {
            id,
            role: Role::Organizer,
            participant_type: None,
            display_name: display_name.to_string(),
            email: email.to_string(),
            discord_webhook_url: None,
        }
    }

    pub fn admin(id: Uuid, email: &str) -> Self {
        Self {
            id,
            role: Role::Admin,
            participant_type: None,
            display_name: "Admin".to_string(),
            email: email.to_string(),
            discord_webhook_url: None,
        }
    }

    pub fn with_discord_webhook(mut self, webhook_url: &str) -> Self {
        self.discord_webhook_url = Some(webhook_url.to_string());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name shown on tickets, falling back to the email address
    pub fn ticket_name(&self) -> String {
        let name = self.display_name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility_matrix() {
        assert!(ParticipantType::Iiit.is_eligible_for(Eligibility::All));
        assert!(ParticipantType::NonIiit.is_eligible_for(Eligibility::All));
        assert!(ParticipantType::Iiit.is_eligible_for(Eligibility::Iiit));
        assert!(!ParticipantType::Iiit.is_eligible_for(Eligibility::NonIiit));
        assert!(!ParticipantType::NonIiit.is_eligible_for(Eligibility::Iiit));
    }

    #[test]
    fn test_ticket_name_falls_back_to_email() {
        let principal = Principal::participant(Uuid::new_v4(), ParticipantType::Iiit, "  ", "a@b.org");
        assert_eq!(principal.ticket_name(), "a@b.org");
    }
}
