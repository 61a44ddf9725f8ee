//! Store abstraction
//!
//! Services talk to storage only through these traits. Every mutation runs
//! inside a [`UnitOfWork`]; dropping one without calling
//! [`UnitOfWork::commit`] discards everything it did.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Event, PaymentStatus, Registration, RegistrationStatus};
use crate::utils::errors::Result;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: UnitOfWork;

    /// Open a new unit of work
    async fn begin(&self) -> Result<Self::Tx>;

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>>;

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>>;

    async fn find_registration_by_ticket(&self, ticket_id: &str) -> Result<Option<Registration>>;

    async fn list_event_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>>;

    async fn list_participant_registrations(&self, participant_id: Uuid) -> Result<Vec<Registration>>;

    /// Record that the ticket confirmation email went out
    async fn mark_confirmation_sent(&self, registration_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    /// Read an event without locking it
    async fn find_event(&mut self, id: Uuid) -> Result<Option<Event>>;

    /// Read an event and hold it against concurrent writers until the unit ends
    async fn lock_event(&mut self, id: Uuid) -> Result<Option<Event>>;

    async fn insert_event(&mut self, event: &Event) -> Result<()>;

    /// Persist organizer-editable fields and status. Capacity counters and
    /// the form lock are never written through here.
    async fn update_event(&mut self, event: &Event) -> Result<Event>;

    /// Remove the event from every read. Its registrations are kept.
    async fn delete_event(&mut self, id: Uuid) -> Result<()>;

    async fn count_active_registrations(&mut self, event_id: Uuid) -> Result<i64>;

    /// Take one seat if the event is Published and `seats_taken <
    /// registration_limit`; false otherwise
    async fn reserve_seat(&mut self, event_id: Uuid) -> Result<bool>;

    async fn release_seat(&mut self, event_id: Uuid) -> Result<()>;

    /// Subtract `quantity` if the event is Published and at least that much
    /// stock remains; false otherwise
    async fn reserve_stock(&mut self, event_id: Uuid, quantity: i32) -> Result<bool>;

    async fn restore_stock(&mut self, event_id: Uuid, quantity: i32) -> Result<()>;

    /// Set the form lock; true when this call flipped it
    async fn lock_form(&mut self, event_id: Uuid) -> Result<bool>;

    async fn find_registration_by_pair(&mut self, event_id: Uuid, participant_id: Uuid)
        -> Result<Option<Registration>>;

    /// Read a registration and hold it against concurrent writers
    async fn lock_registration(&mut self, id: Uuid) -> Result<Option<Registration>>;

    /// Insert a registration, or overwrite the pair's Cancelled/Rejected record
    /// with the same id. Fails with `DuplicateRegistration` when the pair
    /// already holds an active record and with `TicketCollision` when the
    /// ticket id is taken.
    async fn write_admission(&mut self, registration: &Registration) -> Result<Registration>;

    async fn update_registration_status(
        &mut self,
        id: Uuid,
        status: RegistrationStatus,
        payment_status: PaymentStatus,
    ) -> Result<Registration>;

    async fn commit(self) -> Result<()>;
}
