//! Postgres-backed store

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::connection::DatabasePool;
use super::repositories::{EventRepository, RegistrationRepository};
use super::store::{Store, UnitOfWork};
use crate::models::{Event, PaymentStatus, Registration, RegistrationStatus};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DatabasePool,
}

impl PgStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

/// A database transaction; rolled back by sqlx when dropped uncommitted
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        EventRepository::find_by_id(&self.pool, id).await
    }

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>> {
        RegistrationRepository::find_by_id(&self.pool, id).await
    }

    async fn find_registration_by_ticket(&self, ticket_id: &str) -> Result<Option<Registration>> {
        RegistrationRepository::find_by_ticket(&self.pool, ticket_id).await
    }

    async fn list_event_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        RegistrationRepository::list_by_event(&self.pool, event_id).await
    }

    async fn list_participant_registrations(&self, participant_id: Uuid) -> Result<Vec<Registration>> {
        RegistrationRepository::list_by_participant(&self.pool, participant_id).await
    }

    async fn mark_confirmation_sent(&self, registration_id: Uuid) -> Result<()> {
        RegistrationRepository::mark_confirmation_sent(&self.pool, registration_id).await
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_event(&mut self, id: Uuid) -> Result<Option<Event>> {
        EventRepository::find_by_id(&mut *self.tx, id).await
    }

    async fn lock_event(&mut self, id: Uuid) -> Result<Option<Event>> {
        EventRepository::find_for_update(&mut *self.tx, id).await
    }

    async fn insert_event(&mut self, event: &Event) -> Result<()> {
        EventRepository::create(&mut *self.tx, event).await
    }

    async fn update_event(&mut self, event: &Event) -> Result<Event> {
        EventRepository::update(&mut *self.tx, event).await
    }

    async fn delete_event(&mut self, id: Uuid) -> Result<()> {
        EventRepository::delete(&mut *self.tx, id).await
    }

    async fn count_active_registrations(&mut self, event_id: Uuid) -> Result<i64> {
        RegistrationRepository::count_active(&mut *self.tx, event_id).await
    }

    async fn reserve_seat(&mut self, event_id: Uuid) -> Result<bool> {
        EventRepository::reserve_seat(&mut *self.tx, event_id).await
    }

    async fn release_seat(&mut self, event_id: Uuid) -> Result<()> {
        EventRepository::release_seat(&mut *self.tx, event_id).await
    }

    async fn reserve_stock(&mut self, event_id: Uuid, quantity: i32) -> Result<bool> {
        EventRepository::reserve_stock(&mut *self.tx, event_id, quantity).await
    }

    async fn restore_stock(&mut self, event_id: Uuid, quantity: i32) -> Result<()> {
        EventRepository::restore_stock(&mut *self.tx, event_id, quantity).await
    }

    async fn lock_form(&mut self, event_id: Uuid) -> Result<bool> {
        EventRepository::lock_form(&mut *self.tx, event_id).await
    }

    async fn find_registration_by_pair(
        &mut self,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<Registration>> {
        RegistrationRepository::find_by_pair(&mut *self.tx, event_id, participant_id).await
    }

    async fn lock_registration(&mut self, id: Uuid) -> Result<Option<Registration>> {
        RegistrationRepository::find_for_update(&mut *self.tx, id).await
    }

    async fn write_admission(&mut self, registration: &Registration) -> Result<Registration> {
        RegistrationRepository::write_admission(&mut *self.tx, registration).await
    }

    async fn update_registration_status(
        &mut self,
        id: Uuid,
        status: RegistrationStatus,
        payment_status: PaymentStatus,
    ) -> Result<Registration> {
        RegistrationRepository::update_status(&mut *self.tx, id, status, payment_status).await
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
