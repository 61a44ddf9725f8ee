//! Event repository implementation

use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::event::{
    Event, EventDetails, FormField, ItemDetails, SeatLimited, StockLimited,
};
use crate::utils::errors::{EventPassError, Result};

const EVENT_COLUMNS: &str = "id, organizer_id, organizer_name, event_type, name, description, eligibility, \
     registration_deadline, event_start_date, event_end_date, status, tags, discord_webhook_url, \
     registration_limit, registration_fee, form_locked, custom_form_fields, seats_taken, price, stock_quantity, \
     purchase_limit, item_details, created_at, updated_at";

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    organizer_name: Option<String>,
    event_type: String,
    name: String,
    description: String,
    eligibility: String,
    registration_deadline: DateTime<Utc>,
    event_start_date: DateTime<Utc>,
    event_end_date: DateTime<Utc>,
    status: String,
    tags: Vec<String>,
    discord_webhook_url: Option<String>,
    registration_limit: Option<i32>,
    registration_fee: i64,
    form_locked: bool,
    custom_form_fields: Json<Vec<FormField>>,
    seats_taken: i32,
    price: Option<i64>,
    stock_quantity: Option<i32>,
    purchase_limit: i32,
    item_details: Json<ItemDetails>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = EventPassError;

    fn try_from(row: EventRow) -> Result<Self> {
        let details = match row.event_type.as_str() {
            "SeatLimited" => EventDetails::SeatLimited(SeatLimited {
                registration_limit: row.registration_limit,
                registration_fee: row.registration_fee,
                form_locked: row.form_locked,
                custom_form_fields: row.custom_form_fields.0,
                seats_taken: row.seats_taken,
            }),
            "StockLimited" => EventDetails::StockLimited(StockLimited {
                price: row.price,
                stock_quantity: row.stock_quantity,
                purchase_limit: row.purchase_limit,
                item_details: row.item_details.0,
            }),
            other => {
                return Err(EventPassError::InvalidInput(format!("Unknown event type: {}", other)));
            }
        };

        Ok(Event {
            id: row.id,
            organizer_id: row.organizer_id,
            organizer_name: row.organizer_name,
            name: row.name,
            description: row.description,
            eligibility: row.eligibility.parse()?,
            registration_deadline: row.registration_deadline,
            event_start_date: row.event_start_date,
            event_end_date: row.event_end_date,
            status: row.status.parse()?,
            tags: row.tags,
            discord_webhook_url: row.discord_webhook_url,
            details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Column values that differ by variant
struct VariantColumns {
    registration_limit: Option<i32>,
    registration_fee: i64,
    custom_form_fields: Vec<FormField>,
    price: Option<i64>,
    stock_quantity: Option<i32>,
    purchase_limit: i32,
    item_details: ItemDetails,
}

impl From<&EventDetails> for VariantColumns {
    fn from(details: &EventDetails) -> Self {
        match details {
            EventDetails::SeatLimited(seat) => Self {
                registration_limit: seat.registration_limit,
                registration_fee: seat.registration_fee,
                custom_form_fields: seat.custom_form_fields.clone(),
                price: None,
                stock_quantity: None,
                purchase_limit: 1,
                item_details: ItemDetails::default(),
            },
            EventDetails::StockLimited(stock) => Self {
                registration_limit: None,
                registration_fee: 0,
                custom_form_fields: Vec::new(),
                price: stock.price,
                stock_quantity: stock.stock_quantity,
                purchase_limit: stock.purchase_limit,
                item_details: stock.item_details.clone(),
            },
        }
    }
}

/// SQL for the `events` table. Every method takes an executor so it can run
/// against the pool or inside a transaction.
pub struct EventRepository;

impl EventRepository {
    /// Create a new event
    pub async fn create<'e, E: PgExecutor<'e>>(executor: E, event: &Event) -> Result<()> {
        let columns = VariantColumns::from(&event.details);
        sqlx::query(
            r#"
            INSERT INTO events (id, organizer_id, organizer_name, event_type, name, description, eligibility,
                                registration_deadline, event_start_date, event_end_date, status, tags,
                                registration_limit, registration_fee, form_locked, custom_form_fields, seats_taken,
                                price, stock_quantity, purchase_limit, item_details, created_at, updated_at,
                                discord_webhook_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, FALSE, $15, 0,
                    $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.organizer_name)
        .bind(event.details.type_tag())
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.eligibility.as_str())
        .bind(event.registration_deadline)
        .bind(event.event_start_date)
        .bind(event.event_end_date)
        .bind(event.status.as_str())
        .bind(&event.tags)
        .bind(columns.registration_limit)
        .bind(columns.registration_fee)
        .bind(Json(&columns.custom_form_fields))
        .bind(columns.price)
        .bind(columns.stock_quantity)
        .bind(columns.purchase_limit)
        .bind(Json(&columns.item_details))
        .bind(event.created_at)
        .bind(event.updated_at)
        .bind(&event.discord_webhook_url)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Find event by ID; deleted events are not found
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = $1 AND deleted_at IS NULL",
            EVENT_COLUMNS
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        row.map(Event::try_from).transpose()
    }

    /// Find event by ID and hold a row lock until the transaction ends
    pub async fn find_for_update<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        row.map(Event::try_from).transpose()
    }

    /// Update organizer-editable fields and status; never touches
    /// `seats_taken` or `form_locked`
    pub async fn update<'e, E: PgExecutor<'e>>(executor: E, event: &Event) -> Result<Event> {
        let columns = VariantColumns::from(&event.details);
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET name = $2,
                description = $3,
                eligibility = $4,
                registration_deadline = $5,
                event_start_date = $6,
                event_end_date = $7,
                status = $8,
                tags = $9,
                registration_limit = $10,
                registration_fee = $11,
                custom_form_fields = $12,
                price = $13,
                stock_quantity = $14,
                purchase_limit = $15,
                item_details = $16,
                updated_at = NOW()
            WHERE id = $1 AND event_type = $17 AND deleted_at IS NULL
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.eligibility.as_str())
        .bind(event.registration_deadline)
        .bind(event.event_start_date)
        .bind(event.event_end_date)
        .bind(event.status.as_str())
        .bind(&event.tags)
        .bind(columns.registration_limit)
        .bind(columns.registration_fee)
        .bind(Json(&columns.custom_form_fields))
        .bind(columns.price)
        .bind(columns.stock_quantity)
        .bind(columns.purchase_limit)
        .bind(Json(&columns.item_details))
        .bind(event.details.type_tag())
        .fetch_optional(executor)
        .await?;

        row.map(Event::try_from)
            .transpose()?
            .ok_or_else(|| EventPassError::not_found("event", event.id))
    }

    /// Hide the event from every read. The row stays so its registrations
    /// keep their history.
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE events SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Take a seat if one is free and the event is still Published
    pub async fn reserve_seat<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET seats_taken = seats_taken + 1,
                updated_at = NOW()
            WHERE id = $1
              AND status = 'Published'
              AND event_type = 'SeatLimited'
              AND registration_limit IS NOT NULL
              AND seats_taken < registration_limit
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn release_seat<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE events SET seats_taken = GREATEST(seats_taken - 1, 0), updated_at = NOW() WHERE id = $1 AND event_type = 'SeatLimited'",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Decrement stock by `quantity` only if enough remains and the event is
    /// still Published
    pub async fn reserve_stock<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, quantity: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET stock_quantity = stock_quantity - $2,
                updated_at = NOW()
            WHERE id = $1
              AND status = 'Published'
              AND event_type = 'StockLimited'
              AND stock_quantity >= $2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn restore_stock<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, quantity: i32) -> Result<()> {
        sqlx::query(
            "UPDATE events SET stock_quantity = COALESCE(stock_quantity, 0) + $2, updated_at = NOW() WHERE id = $1 AND event_type = 'StockLimited'",
        )
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Freeze the form schema; true when this call did the flip
    pub async fn lock_form<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE events SET form_locked = TRUE, updated_at = NOW() WHERE id = $1 AND event_type = 'SeatLimited' AND NOT form_locked",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
