//! Payment provider integration and reconciliation

#[cfg(test)]
pub(crate) mod mock;
pub mod provider;
pub mod service;
pub mod stripe;
pub mod webhook;

pub use provider::{ChargeRequest, PaymentIntent, PaymentProvider, ProviderError, SetupIntent};
pub use service::{
    AppliedEvent, CaptureOutcome, EventDisposition, InvoiceFigures, PaymentService,
};
pub use stripe::StripeGateway;
pub use webhook::{WebhookError, WebhookEvent, WebhookEventKind, WebhookVerifier};
