//! Registration repository implementation

use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{FormResponse, PaymentStatus, Registration, RegistrationStatus, Selections, TicketSnapshot};
use crate::utils::errors::{EventPassError, Result};

const REGISTRATION_COLUMNS: &str = "id, event_id, participant_id, status, payment_status, quantity, responses, \
     selections, ticket_id, ticket_code, ticket_qr_data_url, ticket_snapshot, confirmation_email_sent, created_at, \
     updated_at";

const PAIR_CONSTRAINT: &str = "registrations_event_participant_key";
const TICKET_CONSTRAINT: &str = "registrations_ticket_id_key";

#[derive(Debug, FromRow)]
struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    participant_id: Uuid,
    status: String,
    payment_status: String,
    quantity: i32,
    responses: Json<Vec<FormResponse>>,
    selections: Option<Json<Selections>>,
    ticket_id: Option<String>,
    ticket_code: Option<String>,
    ticket_qr_data_url: Option<String>,
    ticket_snapshot: Option<Json<TicketSnapshot>>,
    confirmation_email_sent: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = EventPassError;

    fn try_from(row: RegistrationRow) -> Result<Self> {
        Ok(Registration {
            id: row.id,
            event_id: row.event_id,
            participant_id: row.participant_id,
            status: row.status.parse()?,
            payment_status: row.payment_status.parse()?,
            quantity: row.quantity,
            responses: row.responses.0,
            selections: row.selections.map(|s| s.0),
            ticket_id: row.ticket_id,
            ticket_code: row.ticket_code,
            ticket_qr_data_url: row.ticket_qr_data_url,
            ticket_snapshot: row.ticket_snapshot.map(|s| s.0),
            confirmation_email_sent: row.confirmation_email_sent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_rows(rows: Vec<RegistrationRow>) -> Result<Vec<Registration>> {
    rows.into_iter().map(Registration::try_from).collect()
}

/// Translate unique violations into domain errors
fn map_write_error(error: sqlx::Error, registration: &Registration) -> EventPassError {
    if let sqlx::Error::Database(db_error) = &error {
        match db_error.constraint() {
            Some(TICKET_CONSTRAINT) => {
                return EventPassError::TicketCollision {
                    ticket_id: registration.ticket_id.clone().unwrap_or_default(),
                };
            }
            Some(PAIR_CONSTRAINT) | Some("registrations_pkey") => {
                return EventPassError::DuplicateRegistration;
            }
            _ => {}
        }
    }
    EventPassError::Database(error)
}

/// SQL for the `registrations` table
pub struct RegistrationRepository;

impl RegistrationRepository {
    /// Find registration by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM registrations WHERE id = $1",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    pub async fn find_for_update<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM registrations WHERE id = $1 FOR UPDATE",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    /// Find the record for an (event, participant) pair
    pub async fn find_by_pair<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM registrations WHERE event_id = $1 AND participant_id = $2",
            REGISTRATION_COLUMNS
        ))
        .bind(event_id)
        .bind(participant_id)
        .fetch_optional(executor)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    pub async fn find_by_ticket<'e, E: PgExecutor<'e>>(executor: E, ticket_id: &str) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM registrations WHERE ticket_id = $1",
            REGISTRATION_COLUMNS
        ))
        .bind(ticket_id)
        .fetch_optional(executor)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    /// All registrations of an event, oldest first
    pub async fn list_by_event<'e, E: PgExecutor<'e>>(executor: E, event_id: Uuid) -> Result<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM registrations WHERE event_id = $1 ORDER BY created_at ASC",
            REGISTRATION_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(executor)
        .await?;

        map_rows(rows)
    }

    /// All registrations of a participant, newest first
    pub async fn list_by_participant<'e, E: PgExecutor<'e>>(
        executor: E,
        participant_id: Uuid,
    ) -> Result<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM registrations WHERE participant_id = $1 ORDER BY created_at DESC",
            REGISTRATION_COLUMNS
        ))
        .bind(participant_id)
        .fetch_all(executor)
        .await?;

        map_rows(rows)
    }

    pub async fn count_active<'e, E: PgExecutor<'e>>(executor: E, event_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status IN ('Registered', 'Waitlisted', 'Attended')",
        )
        .bind(event_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// Insert a registration, or revive the pair's inactive record with the
    /// same id. The conflict arm only fires for Cancelled/Rejected rows, so a
    /// concurrent admission for the same pair comes back empty.
    pub async fn write_admission<'e, E: PgExecutor<'e>>(
        executor: E,
        registration: &Registration,
    ) -> Result<Registration> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            INSERT INTO registrations (id, event_id, participant_id, status, payment_status, quantity, responses,
                                       selections, ticket_id, ticket_code, ticket_qr_data_url, ticket_snapshot,
                                       confirmation_email_sent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT ON CONSTRAINT {} DO UPDATE
            SET status = EXCLUDED.status,
                payment_status = EXCLUDED.payment_status,
                quantity = EXCLUDED.quantity,
                responses = EXCLUDED.responses,
                selections = EXCLUDED.selections,
                ticket_id = EXCLUDED.ticket_id,
                ticket_code = EXCLUDED.ticket_code,
                ticket_qr_data_url = EXCLUDED.ticket_qr_data_url,
                ticket_snapshot = EXCLUDED.ticket_snapshot,
                confirmation_email_sent = EXCLUDED.confirmation_email_sent,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            WHERE registrations.id = EXCLUDED.id
              AND registrations.status IN ('Cancelled', 'Rejected')
            RETURNING {}
            "#,
            PAIR_CONSTRAINT, REGISTRATION_COLUMNS
        ))
        .bind(registration.id)
        .bind(registration.event_id)
        .bind(registration.participant_id)
        .bind(registration.status.as_str())
        .bind(registration.payment_status.as_str())
        .bind(registration.quantity)
        .bind(Json(&registration.responses))
        .bind(registration.selections.as_ref().map(Json))
        .bind(&registration.ticket_id)
        .bind(&registration.ticket_code)
        .bind(&registration.ticket_qr_data_url)
        .bind(registration.ticket_snapshot.as_ref().map(Json))
        .bind(registration.confirmation_email_sent)
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_write_error(e, registration))?;

        match row {
            Some(row) => Registration::try_from(row),
            None => Err(EventPassError::DuplicateRegistration),
        }
    }

    pub async fn update_status<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        status: RegistrationStatus,
        payment_status: PaymentStatus,
    ) -> Result<Registration> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            UPDATE registrations
            SET status = $2,
                payment_status = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(payment_status.as_str())
        .fetch_optional(executor)
        .await?;

        row.map(Registration::try_from)
            .transpose()?
            .ok_or_else(|| EventPassError::not_found("registration", id))
    }

    pub async fn mark_confirmation_sent<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE registrations SET confirmation_email_sent = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EventPassError::not_found("registration", id));
        }
        Ok(())
    }
}
