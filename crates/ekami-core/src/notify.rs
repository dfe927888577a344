//! Transactional email boundary.
//!
//! Notifications are best effort: a failure is logged and reported back as a
//! [`NotificationOutcome`], it never undoes or blocks the write that triggered it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use ekami_domain::RepairRequest;

use crate::store::{collections, to_record, RecordStore};
use crate::time::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifications are disabled")]
    Disabled,
    #[error("notification transport failed: {0}")]
    Transport(String),
}

pub trait Notifier: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    /// Delivery failed; the message is kept for the user-facing warning.
    Failed(String),
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }
}

/// Sends `message` once and folds any failure into a logged, non-blocking outcome.
pub fn send_best_effort(notifier: &dyn Notifier, message: &EmailMessage) -> NotificationOutcome {
    match notifier.send(message) {
        Ok(()) => {
            tracing::info!(to = %message.to, subject = %message.subject, "notification sent");
            NotificationOutcome::Sent
        }
        Err(err) => {
            tracing::warn!(to = %message.to, error = %err, "notification failed; continuing");
            NotificationOutcome::Failed(err.to_string())
        }
    }
}

/// Queues messages in the `notification_outbox` collection for a mailer to drain.
pub struct OutboxNotifier {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Serialize)]
struct OutboxEntry<'a> {
    id: Uuid,
    status: &'static str,
    created_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    message: &'a EmailMessage,
}

impl OutboxNotifier {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl Notifier for OutboxNotifier {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let entry = OutboxEntry {
            id: Uuid::new_v4(),
            status: "queued",
            created_at: self.clock.now(),
            message,
        };
        let record = to_record(&entry).map_err(|err| NotifyError::Transport(err.to_string()))?;
        self.store
            .insert(collections::NOTIFICATION_OUTBOX, record)
            .map(|_| ())
            .map_err(|err| NotifyError::Transport(err.to_string()))
    }
}

/// Notifier used when email delivery is switched off in configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn send(&self, _message: &EmailMessage) -> Result<(), NotifyError> {
        Err(NotifyError::Disabled)
    }
}

/// Staff-facing email announcing a newly received repair request.
pub fn repair_received_email(request: &RepairRequest, from: &str, to: &str) -> EmailMessage {
    let appointment = match (request.appointment_date, request.appointment_time) {
        (Some(date), Some(time)) => format!("{} at {}", date, time.format("%H:%M")),
        _ => "not scheduled".to_string(),
    };
    let html = format!(
        "<h2>New repair request</h2>\
         <p><strong>Customer:</strong> {name} ({email}, {phone})</p>\
         <p><strong>Vehicle:</strong> {vehicle}</p>\
         <p><strong>Service:</strong> {service}</p>\
         <p><strong>Problem:</strong> {problem}</p>\
         <p><strong>Urgency:</strong> {urgency}</p>\
         <p><strong>Appointment:</strong> {appointment} ({location})</p>",
        name = escape_html(&request.customer_name),
        email = escape_html(&request.customer_email),
        phone = escape_html(&request.customer_phone),
        vehicle = escape_html(&request.vehicle.label()),
        service = escape_html(&request.service_summary()),
        problem = escape_html(&request.problem_description),
        urgency = request.urgency,
        appointment = appointment,
        location = request.service_location,
    );
    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject: format!("New repair request from {}", request.customer_name),
        html,
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::store::MemoryStore;
    use crate::time::FixedClock;

    fn message() -> EmailMessage {
        EmailMessage {
            from: "noreply@ekami.example".into(),
            to: "workshop@ekami.example".into(),
            subject: "Hello".into(),
            html: "<p>Hi</p>".into(),
        }
    }

    #[test]
    fn outbox_notifier_queues_message() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()));
        let notifier = OutboxNotifier::new(store.clone(), clock);

        let outcome = send_best_effort(&notifier, &message());

        assert!(outcome.is_sent());
        assert_eq!(store.count(collections::NOTIFICATION_OUTBOX), 1);
    }

    #[test]
    fn disabled_notifier_reports_failure_without_panicking() {
        let outcome = send_best_effort(&DisabledNotifier, &message());
        assert_eq!(
            outcome,
            NotificationOutcome::Failed("notifications are disabled".into())
        );
    }

    #[test]
    fn html_escaping_neutralises_markup() {
        assert_eq!(escape_html("<b>&'\""), "&lt;b&gt;&amp;&#39;&quot;");
    }
}
