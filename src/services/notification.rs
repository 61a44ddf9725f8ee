//! Notification service implementation
//!
//! Ticket confirmation emails and event publication announcements are best
//! effort. Services hand a [`Notification`] to [`NotificationService`] after
//! their unit of work commits; a background worker delivers it. Delivery
//! failures are logged and counted, never returned to the caller.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{NotificationConfig, SmtpConfig};
use crate::database::Store;
use crate::models::{Event, Registration};
use crate::utils::errors::{EventPassError, Result};
use crate::utils::helpers::{escape_html, format_schedule, format_timestamp, truncate_text};
use crate::utils::logging::log_notification_failure;

const DISCORD_USERNAME: &str = "EventPass Event Bot";
const DISCORD_EMBED_COLOR: u32 = 3_447_003;
const DISCORD_DESCRIPTION_LIMIT: usize = 4096;

/// Work item for the notification worker
#[derive(Debug, Clone)]
pub enum Notification {
    TicketConfirmation {
        registration: Registration,
        event: Event,
        reference_url: String,
    },
    EventPublished {
        event: Event,
    },
}

impl Notification {
    fn kind(&self) -> &'static str {
        match self {
            Notification::TicketConfirmation { .. } => "ticket_confirmation",
            Notification::EventPublished { .. } => "event_published",
        }
    }
}

/// A rendered email
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailOutcome {
    Sent,
    /// No transport configured
    Skipped,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<EmailOutcome>;
}

/// SMTP delivery through lettre
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email).parse()?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<EmailOutcome> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(email.text.clone(), email.html.clone()))?;

        self.transport.send(message).await?;
        Ok(EmailOutcome::Sent)
    }
}

/// Used when SMTP is not configured; logs and reports the email as skipped
#[derive(Debug, Clone, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<EmailOutcome> {
        warn!(to = %email.to, subject = %email.subject, "Email skipped: SMTP settings are missing");
        Ok(EmailOutcome::Skipped)
    }
}

/// Render the ticket confirmation for a freshly admitted registration
pub fn ticket_confirmation_email(registration: &Registration, event: &Event, reference_url: &str) -> Option<OutgoingEmail> {
    let snapshot = registration.ticket_snapshot.as_ref()?;
    let ticket_id = registration.ticket_id.as_deref()?;
    let schedule = format_schedule(event.event_start_date, event.event_end_date);

    let subject = format!("Ticket Confirmation: {}", event.name);
    let text = [
        format!("Hello {},", snapshot.participant_name),
        String::new(),
        format!("Your registration for {} is confirmed.", event.name),
        format!("Ticket ID: {}", ticket_id),
        format!("Event Type: {}", snapshot.event_type),
        format!("Organizer: {}", snapshot.organizer_name),
        format!("Schedule: {}", schedule),
        format!("Ticket: {}", reference_url),
        String::new(),
        "Please keep this ticket ID for check-in.".to_string(),
    ]
    .join("\n");

    let qr_image = registration
        .ticket_qr_data_url
        .as_deref()
        .map(|url| {
            format!(
                r#"
    <p><img alt="Ticket QR" src="{}" style="max-width: 220px; border: 1px solid #ddd; padding: 6px;" /></p>"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; line-height: 1.5;">
    <h2>Registration Confirmed</h2>
    <p>Hello {name},</p>
    <p>Your registration for <strong>{event}</strong> is confirmed.</p>
    <p><strong>Ticket ID:</strong> {ticket}</p>
    <p><strong>Event Type:</strong> {event_type}</p>
    <p><strong>Organizer:</strong> {organizer}</p>
    <p><strong>Schedule:</strong> {schedule}</p>{qr_image}
    <p><a href="{url}">View your ticket</a></p>
    <p>Please carry this ticket ID or QR code for entry.</p>
</div>"#,
        name = escape_html(&snapshot.participant_name),
        event = escape_html(&event.name),
        ticket = escape_html(ticket_id),
        event_type = escape_html(&snapshot.event_type),
        organizer = escape_html(&snapshot.organizer_name),
        schedule = escape_html(&schedule),
        qr_image = qr_image,
        url = escape_html(reference_url),
    );

    Some(OutgoingEmail {
        to: snapshot.participant_email.clone(),
        subject,
        text,
        html,
    })
}

/// Posts publication announcements to Discord webhooks. Each event goes to
/// its organizer's webhook, or to the fallback when the organizer has none.
pub struct DiscordWebhookNotifier {
    client: reqwest::Client,
    fallback_url: Option<String>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

impl DiscordWebhookNotifier {
    pub fn new(requests_per_minute: u32) -> Result<Self> {
        let rate = NonZeroU32::new(requests_per_minute)
            .ok_or_else(|| EventPassError::Config("Webhook rate must be greater than 0".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            fallback_url: None,
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(rate))),
        })
    }

    /// Announce events of organizers without a webhook here
    pub fn with_fallback(mut self, webhook_url: &str) -> Self {
        let url = webhook_url.trim();
        self.fallback_url = (!url.is_empty()).then(|| url.to_string());
        self
    }

    /// Where the announcement for `event` goes, if anywhere
    pub fn target<'a>(&'a self, event: &'a Event) -> Option<&'a str> {
        event
            .discord_webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .or(self.fallback_url.as_deref())
    }

    pub fn announcement_body(event: &Event) -> serde_json::Value {
        let fields = vec![
            EmbedField {
                name: "Organizer",
                value: event.organizer_name.clone().unwrap_or_else(|| "Unknown".to_string()),
                inline: true,
            },
            EmbedField {
                name: "Type",
                value: event.details.type_tag().to_string(),
                inline: true,
            },
            EmbedField {
                name: "Eligibility",
                value: event.eligibility.to_string(),
                inline: true,
            },
            EmbedField {
                name: "Registration Deadline",
                value: format_timestamp(event.registration_deadline),
                inline: false,
            },
            EmbedField {
                name: "Schedule",
                value: format_schedule(event.event_start_date, event.event_end_date),
                inline: false,
            },
        ];

        json!({
            "username": DISCORD_USERNAME,
            "embeds": [{
                "title": format!("New Event Published: {}", event.name),
                "description": truncate_text(&event.description, DISCORD_DESCRIPTION_LIMIT),
                "color": DISCORD_EMBED_COLOR,
                "fields": fields,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }]
        })
    }

    pub async fn announce(&self, webhook_url: &str, event: &Event) -> Result<()> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .post(webhook_url)
            .json(&Self::announcement_body(event))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EventPassError::ServiceUnavailable(format!(
                "Discord webhook failed ({}): {}",
                status,
                if body.is_empty() { "Unknown error" } else { body.as_str() }
            )));
        }

        Ok(())
    }
}

/// Delivery counters reported when the worker stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_skipped: u64,
    pub total_failed: u64,
}

/// Cheap handle used by services to enqueue notifications
#[derive(Debug, Clone)]
pub struct NotificationService {
    sender: Option<mpsc::Sender<Notification>>,
}

impl NotificationService {
    /// A handle that drops everything it is given
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Spawn a worker and return the handle feeding it. The worker stops
    /// once every handle is dropped and the queue is drained.
    pub fn spawn<S: Store>(
        store: Arc<S>,
        email: Arc<dyn EmailSender>,
        discord: Option<DiscordWebhookNotifier>,
        capacity: usize,
    ) -> (Self, JoinHandle<NotificationStats>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = NotificationWorker {
            receiver,
            store,
            email,
            discord,
            stats: NotificationStats::default(),
        };
        let handle = tokio::spawn(worker.run());
        (Self { sender: Some(sender) }, handle)
    }

    /// Build the transports from configuration and spawn the worker
    pub fn start<S: Store>(
        config: &NotificationConfig,
        store: Arc<S>,
    ) -> Result<(Self, JoinHandle<NotificationStats>)> {
        let email: Arc<dyn EmailSender> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpEmailSender::new(smtp)?),
            None => Arc::new(LogEmailSender),
        };
        let mut discord = DiscordWebhookNotifier::new(config.webhook_requests_per_minute)?;
        if let Some(url) = &config.discord_webhook_url {
            discord = discord.with_fallback(url);
        }

        info!(
            smtp = config.smtp.is_some(),
            discord_fallback = discord.fallback_url.is_some(),
            "Notification worker starting"
        );
        Ok(Self::spawn(store, email, Some(discord), config.queue_capacity))
    }

    /// Enqueue without waiting; a full or closed queue drops the notification
    pub fn notify(&self, notification: Notification) {
        let Some(sender) = &self.sender else {
            debug!(kind = notification.kind(), "Notifications disabled, dropping");
            return;
        };

        if let Err(e) = sender.try_send(notification) {
            let (reason, notification) = match e {
                mpsc::error::TrySendError::Full(n) => ("queue full", n),
                mpsc::error::TrySendError::Closed(n) => ("worker stopped", n),
            };
            warn!(kind = notification.kind(), reason = reason, "Notification dropped");
        }
    }
}

struct NotificationWorker<S: Store> {
    receiver: mpsc::Receiver<Notification>,
    store: Arc<S>,
    email: Arc<dyn EmailSender>,
    discord: Option<DiscordWebhookNotifier>,
    stats: NotificationStats,
}

impl<S: Store> NotificationWorker<S> {
    async fn run(mut self) -> NotificationStats {
        while let Some(notification) = self.receiver.recv().await {
            self.handle(notification).await;
        }
        info!(
            sent = self.stats.total_sent,
            skipped = self.stats.total_skipped,
            failed = self.stats.total_failed,
            "Notification worker stopped"
        );
        self.stats
    }

    async fn handle(&mut self, notification: Notification) {
        match notification {
            Notification::TicketConfirmation {
                registration,
                event,
                reference_url,
            } => self.send_ticket_confirmation(&registration, &event, &reference_url).await,
            Notification::EventPublished { event } => self.announce(&event).await,
        }
    }

    async fn send_ticket_confirmation(&mut self, registration: &Registration, event: &Event, reference_url: &str) {
        let Some(email) = ticket_confirmation_email(registration, event, reference_url) else {
            warn!(registration_id = %registration.id, "Registration has no ticket, confirmation skipped");
            self.stats.total_skipped += 1;
            return;
        };

        match self.email.send(&email).await {
            Ok(EmailOutcome::Sent) => {
                self.stats.total_sent += 1;
                self.mark_sent(registration.id).await;
                info!(registration_id = %registration.id, "Ticket confirmation sent");
            }
            Ok(EmailOutcome::Skipped) => {
                self.stats.total_skipped += 1;
            }
            Err(e) => {
                self.stats.total_failed += 1;
                log_notification_failure("ticket_confirmation", &email.to, &e);
            }
        }
    }

    async fn mark_sent(&self, registration_id: Uuid) {
        if let Err(e) = self.store.mark_confirmation_sent(registration_id).await {
            log_notification_failure("ticket_confirmation", &registration_id.to_string(), &e);
        }
    }

    async fn announce(&mut self, event: &Event) {
        let Some((discord, webhook_url)) = self
            .discord
            .as_ref()
            .and_then(|discord| discord.target(event).map(|url| (discord, url)))
        else {
            debug!(event_id = %event.id, "No Discord webhook for this event, announcement skipped");
            self.stats.total_skipped += 1;
            return;
        };

        match discord.announce(webhook_url, event).await {
            Ok(()) => {
                self.stats.total_sent += 1;
                info!(event_id = %event.id, "Event announced on Discord");
            }
            Err(e) => {
                self.stats.total_failed += 1;
                log_notification_failure("event_published", &event.id.to_string(), &e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Eligibility, EventDetails, EventStatus, PaymentStatus, RegistrationStatus, StockLimited, TicketSnapshot,
    };

    const TICKET_URL: &str = "https://tickets.example.org/tickets/FEL-1";

    fn quiz(name: &str) -> Event {
        let now = chrono::Utc::now();
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            organizer_name: None,
            name: name.to_string(),
            description: "General quiz".to_string(),
            eligibility: Eligibility::All,
            registration_deadline: now,
            event_start_date: now,
            event_end_date: now,
            status: EventStatus::Published,
            tags: Vec::new(),
            discord_webhook_url: None,
            details: EventDetails::StockLimited(StockLimited {
                price: None,
                stock_quantity: None,
                purchase_limit: 1,
                item_details: Default::default(),
            }),
            created_at: now,
            updated_at: now,
        }
    }

    fn ticketed(event: &Event, participant_name: &str, organizer_name: &str) -> Registration {
        let now = chrono::Utc::now();
        Registration {
            id: Uuid::new_v4(),
            event_id: event.id,
            participant_id: Uuid::new_v4(),
            status: RegistrationStatus::Registered,
            payment_status: PaymentStatus::NotApplicable,
            quantity: 1,
            responses: Vec::new(),
            selections: None,
            ticket_id: Some("FEL-LOYW3V28-9C1A04BF".to_string()),
            ticket_code: Some("eyJ0aWNrZXRJZCI6IkZFTCJ9".to_string()),
            ticket_qr_data_url: Some("data:image/svg+xml;base64,PHN2Zz48L3N2Zz4".to_string()),
            ticket_snapshot: Some(TicketSnapshot {
                event_name: event.name.clone(),
                event_type: "StockLimited".to_string(),
                organizer_name: organizer_name.to_string(),
                participant_name: participant_name.to_string(),
                participant_email: "asha@example.org".to_string(),
            }),
            confirmation_email_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        assert!(matches!(DiscordWebhookNotifier::new(0), Err(EventPassError::Config(_))));
    }

    #[test]
    fn test_organizer_webhook_wins_over_fallback() {
        let fallback = "https://discord.com/api/webhooks/1/fallback";
        let own = "https://discord.com/api/webhooks/2/own";
        let notifier = DiscordWebhookNotifier::new(30).unwrap().with_fallback(fallback);

        let mut event = quiz("Quiz");
        assert_eq!(notifier.target(&event), Some(fallback));

        event.discord_webhook_url = Some(own.to_string());
        assert_eq!(notifier.target(&event), Some(own));

        let bare = DiscordWebhookNotifier::new(30).unwrap().with_fallback("  ");
        assert_eq!(bare.target(&event), Some(own));
        event.discord_webhook_url = None;
        assert_eq!(bare.target(&event), None);
    }

    #[test]
    fn test_confirmation_html_escapes_names() {
        let event = quiz("<script>alert(1)</script> Quiz");
        let registration = ticketed(&event, "Asha \"<b>\"", "Q & A Club");

        let email = ticket_confirmation_email(&registration, &event, TICKET_URL).unwrap();

        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;alert(1)&lt;/script&gt; Quiz"));
        assert!(email.html.contains("Asha &quot;&lt;b&gt;&quot;"));
        assert!(email.html.contains("Q &amp; A Club"));
        // the plain-text part is left as written
        assert!(email.text.contains("<script>alert(1)</script> Quiz"));
    }

    #[test]
    fn test_confirmation_html_embeds_qr_image() {
        let event = quiz("Quiz");
        let registration = ticketed(&event, "Asha", "Quiz Club");

        let email = ticket_confirmation_email(&registration, &event, TICKET_URL).unwrap();
        assert!(email
            .html
            .contains(r#"<img alt="Ticket QR" src="data:image/svg+xml;base64,PHN2Zz48L3N2Zz4""#));

        let mut without_qr = registration.clone();
        without_qr.ticket_qr_data_url = None;
        let email = ticket_confirmation_email(&without_qr, &event, TICKET_URL).unwrap();
        assert!(!email.html.contains("<img"));
    }

    #[tokio::test]
    async fn test_disabled_service_drops_silently() {
        let service = NotificationService::disabled();
        service.notify(Notification::EventPublished { event: quiz("Quiz") });
    }
}
