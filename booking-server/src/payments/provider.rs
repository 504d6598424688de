//! Payment provider abstraction
//!
//! The core never talks to the provider SDK directly; it is written against
//! this capability trait so any provider with setup-intent/intent/webhook
//! semantics can fulfill the contract, and tests can inject a fake.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Provider-side failures, split by retryability
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network/timeout failure; the whole operation is safe to retry
    #[error("provider unreachable: {0}")]
    Network(String),

    /// Card declined; terminal for this payment method
    #[error("payment declined: {0}")]
    Declined(String),

    /// Provider rejected the request (bad params, auth); terminal
    #[error("provider error: {0}")]
    Api(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Network(_))
    }
}

/// A provider-side setup intent (card authorization session)
#[derive(Debug, Clone, Serialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

/// A provider-side payment intent
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

/// Parameters for creating a payment intent
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Amount in integer minor units (e.g. 7056 for $70.56)
    pub amount_minor: i64,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    /// Confirm immediately instead of returning a client secret for
    /// client-side confirmation
    pub confirm: bool,
    /// Charge without the customer present (cancellation fees)
    pub off_session: bool,
    /// Carried in intent metadata for webhook correlation
    pub booking_id: u64,
}

impl ChargeRequest {
    pub fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([("booking_id".to_string(), self.booking_id.to_string())])
    }
}

/// Payment provider trait
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a provider customer profile, returning its id
    async fn create_customer(&self, email: &str, name: &str) -> Result<String, ProviderError>;

    /// Create a setup intent for collecting a reusable payment method
    async fn create_setup_intent(
        &self,
        customer_id: &str,
        booking_id: u64,
    ) -> Result<SetupIntent, ProviderError>;

    /// Create a payment intent for the given amount
    async fn create_payment_intent(
        &self,
        request: &ChargeRequest,
    ) -> Result<PaymentIntent, ProviderError>;

    /// Confirm (capture) a previously created intent
    async fn confirm_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, ProviderError>;
}
