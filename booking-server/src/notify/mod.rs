//! Outbound notifications
//!
//! Every successful transition produces a [`Notification`] snapshot which is
//! handed to a [`Notifier`] fire-and-forget, after the state change has
//! committed. A notifier failure is logged and dropped; it can never roll
//! back or mask the transition that produced it.

use async_trait::async_trait;
use tracing::{error, info};

use shared::models::{Booking, PaymentRecord, Quotation};

/// What happened, for templating purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    QuoteRequested,
    QuoteSent,
    BookingConfirmed,
    InvoiceSent,
    PaymentConfirmed,
    BookingCancelled,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::QuoteRequested => "quote_requested",
            NotificationKind::QuoteSent => "quote_sent",
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::InvoiceSent => "invoice_sent",
            NotificationKind::PaymentConfirmed => "payment_confirmed",
            NotificationKind::BookingCancelled => "booking_cancelled",
        }
    }
}

/// Data snapshot accompanying a notification. Carries everything a template
/// needs so the notifier never reads the store.
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub booking: Booking,
    pub quotation: Option<Quotation>,
    pub payment: Option<PaymentRecord>,
}

impl Notification {
    pub fn new(kind: NotificationKind, booking: Booking) -> Self {
        Self {
            kind,
            booking,
            quotation: None,
            payment: None,
        }
    }

    pub fn with_quotation(mut self, quotation: Quotation) -> Self {
        self.quotation = Some(quotation);
        self
    }

    pub fn with_payment(mut self, payment: PaymentRecord) -> Self {
        self.payment = Some(payment);
        self
    }
}

/// Notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Default sink: structured log lines only. Stands in until an email/SMS
/// integration is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            kind = notification.kind.as_str(),
            booking_id = notification.booking.id,
            customer = %notification.booking.customer_email,
            "Notification dispatched"
        );
        Ok(())
    }
}

/// Fire-and-forget dispatch: spawn, log on failure, never propagate
pub fn dispatch(notifier: std::sync::Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&notification).await {
            error!(
                kind = notification.kind.as_str(),
                booking_id = notification.booking.id,
                error = %e,
                "Notification delivery failed"
            );
        }
    });
}
