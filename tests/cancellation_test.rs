//! Cancellation and organizer review

mod helpers;

use assert_matches::assert_matches;
use chrono::Duration;
use helpers::*;
use EventPass::models::{PaymentStatus, RegistrationStatus};
use EventPass::{EventPassError, Store};

#[tokio::test]
async fn test_cancel_restores_purchased_quantity_once() {
    let ctx = TestContext::new();
    let event = ctx.published_stock_event(10, 3).await;
    let asha = participant("Asha");
    let admissions = &ctx.services.admissions;

    let registration = admissions.admit(event.id, &asha, purchase(2, "M")).await.unwrap();
    let stock = |e: EventPass::models::Event| e.stock_limited().unwrap().stock_quantity;
    assert_eq!(stock(ctx.store.find_event(event.id).await.unwrap().unwrap()), Some(8));

    let cancelled = admissions.cancel(registration.id, &asha).await.unwrap();
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert_eq!(stock(ctx.store.find_event(event.id).await.unwrap().unwrap()), Some(10));

    assert_matches!(
        admissions.cancel(registration.id, &asha).await,
        Err(EventPassError::AlreadyCancelled)
    );
    assert_eq!(stock(ctx.store.find_event(event.id).await.unwrap().unwrap()), Some(10));
}

#[tokio::test]
async fn test_cancel_releases_seat() {
    let ctx = TestContext::new();
    let event = ctx.published_seat_event(3).await;
    let asha = participant("Asha");

    let registration = ctx
        .services
        .admissions
        .admit(event.id, &asha, form_answers(&event))
        .await
        .unwrap();
    let cancelled = ctx.services.admissions.cancel(registration.id, &asha).await.unwrap();

    // free events have nothing to refund
    assert_eq!(cancelled.payment_status, PaymentStatus::NotApplicable);
    let stored = ctx.store.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.seat_limited().unwrap().seats_taken, 0);
    // the form stays locked once anyone has registered
    assert!(stored.seat_limited().unwrap().form_locked);
}

#[tokio::test]
async fn test_cancel_after_start_rejected() {
    let ctx = TestContext::new();
    let event = ctx.published_seat_event(3).await;
    let asha = participant("Asha");
    let registration = ctx
        .services
        .admissions
        .admit(event.id, &asha, form_answers(&event))
        .await
        .unwrap();

    ctx.clock.set(event.event_start_date + Duration::hours(1));
    assert_matches!(
        ctx.services.admissions.cancel(registration.id, &asha).await,
        Err(EventPassError::EventStarted)
    );

    let stored = ctx.store.find_registration(registration.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RegistrationStatus::Registered);
}

#[tokio::test]
async fn test_cancel_between_deadline_and_start_allowed() {
    let ctx = TestContext::new();
    let event = ctx.published_seat_event(3).await;
    let asha = participant("Asha");
    let registration = ctx
        .services
        .admissions
        .admit(event.id, &asha, form_answers(&event))
        .await
        .unwrap();

    ctx.pass_deadline(&event);
    assert!(ctx.services.admissions.cancel(registration.id, &asha).await.is_ok());
}

#[tokio::test]
async fn test_cannot_cancel_someone_elses_registration() {
    let ctx = TestContext::new();
    let event = ctx.published_seat_event(3).await;
    let registration = ctx
        .services
        .admissions
        .admit(event.id, &participant("Asha"), form_answers(&event))
        .await
        .unwrap();

    let err = ctx
        .services
        .admissions
        .cancel(registration.id, &participant("Ravi"))
        .await
        .unwrap_err();
    assert_matches!(err, EventPassError::NotFound { entity: "registration", .. });
}

#[tokio::test]
async fn test_cancel_unknown_registration() {
    let ctx = TestContext::new();
    assert_matches!(
        ctx.services
            .admissions
            .cancel(uuid::Uuid::new_v4(), &participant("Asha"))
            .await,
        Err(EventPassError::NotFound { .. })
    );
}

#[tokio::test]
async fn test_organizer_marks_attendance() {
    let ctx = TestContext::new();
    let event = ctx.published_stock_event(5, 2).await;
    let registration = ctx
        .services
        .admissions
        .admit(event.id, &participant("Asha"), purchase(2, "L"))
        .await
        .unwrap();

    let attended = ctx
        .services
        .admissions
        .set_registration_status(&ctx.organizer, registration.id, RegistrationStatus::Attended)
        .await
        .unwrap();
    assert_eq!(attended.status, RegistrationStatus::Attended);
    assert_eq!(attended.payment_status, PaymentStatus::Completed);

    // attendance still holds its stock
    let stored = ctx.store.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.stock_limited().unwrap().stock_quantity, Some(3));

    assert_matches!(
        ctx.services
            .admissions
            .set_registration_status(&ctx.organizer, registration.id, RegistrationStatus::Rejected)
            .await,
        Err(EventPassError::InvalidTransition { .. })
    );
}

#[tokio::test]
async fn test_rejection_releases_capacity() {
    let ctx = TestContext::new();
    let event = ctx.published_stock_event(5, 2).await;
    let registration = ctx
        .services
        .admissions
        .admit(event.id, &participant("Asha"), purchase(2, "S"))
        .await
        .unwrap();

    let rejected = ctx
        .services
        .admissions
        .set_registration_status(&ctx.organizer, registration.id, RegistrationStatus::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.status, RegistrationStatus::Rejected);
    assert_eq!(rejected.payment_status, PaymentStatus::Refunded);

    let stored = ctx.store.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.stock_limited().unwrap().stock_quantity, Some(5));
}

#[tokio::test]
async fn test_review_requires_event_owner() {
    let ctx = TestContext::new();
    let event = ctx.published_seat_event(5).await;
    let registration = ctx
        .services
        .admissions
        .admit(event.id, &participant("Asha"), form_answers(&event))
        .await
        .unwrap();

    assert_matches!(
        ctx.services
            .admissions
            .set_registration_status(&organizer("Drama Club"), registration.id, RegistrationStatus::Attended)
            .await,
        Err(EventPassError::PermissionDenied(_))
    );

    let admin = EventPass::models::Principal::admin(uuid::Uuid::new_v4(), "admin@example.org");
    assert!(ctx
        .services
        .admissions
        .set_registration_status(&admin, registration.id, RegistrationStatus::Attended)
        .await
        .is_ok());
}
