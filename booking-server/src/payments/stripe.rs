//! Stripe payment provider implementation
//!
//! Form-encoded calls against the Stripe REST API with basic auth. Network
//! failures map to retryable [`ProviderError::Network`]; a 402 maps to
//! [`ProviderError::Declined`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use super::provider::{ChargeRequest, PaymentIntent, PaymentProvider, ProviderError, SetupIntent};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe-backed [`PaymentProvider`]
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.into(),
        }
    }

    /// Make an authenticated form-encoded request to Stripe
    async fn stripe_request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        form: &[(String, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{STRIPE_API_BASE}{endpoint}");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %endpoint, "Stripe API request failed");
                if e.is_timeout() || e.is_connect() {
                    ProviderError::Network(e.to_string())
                } else {
                    ProviderError::Api(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Stripe API error");
            if status == reqwest::StatusCode::PAYMENT_REQUIRED {
                return Err(ProviderError::Declined(format!("Stripe declined: {status}")));
            }
            if status.is_server_error() {
                return Err(ProviderError::Network(format!("Stripe API error: {status}")));
            }
            return Err(ProviderError::Api(format!("Stripe API error: {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Api(format!("unparseable Stripe response: {e}")))
    }
}

#[async_trait]
impl PaymentProvider for StripeGateway {
    async fn create_customer(&self, email: &str, name: &str) -> Result<String, ProviderError> {
        debug!(email = %email, "Creating Stripe customer");

        let form = vec![
            ("email".to_string(), email.to_string()),
            ("name".to_string(), name.to_string()),
        ];
        let customer: StripeCustomer = self.stripe_request("/customers", &form).await?;
        Ok(customer.id)
    }

    async fn create_setup_intent(
        &self,
        customer_id: &str,
        booking_id: u64,
    ) -> Result<SetupIntent, ProviderError> {
        debug!(customer_id = %customer_id, booking_id, "Creating Stripe setup intent");

        let form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("usage".to_string(), "off_session".to_string()),
            (
                "metadata[booking_id]".to_string(),
                booking_id.to_string(),
            ),
        ];
        let intent: StripeSetupIntent = self.stripe_request("/setup_intents", &form).await?;
        Ok(SetupIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            status: intent.status,
        })
    }

    async fn create_payment_intent(
        &self,
        request: &ChargeRequest,
    ) -> Result<PaymentIntent, ProviderError> {
        debug!(
            booking_id = request.booking_id,
            amount_minor = request.amount_minor,
            confirm = request.confirm,
            "Creating Stripe payment intent"
        );

        let mut form = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency.to_lowercase()),
            ("customer".to_string(), request.customer_id.clone()),
            (
                "payment_method".to_string(),
                request.payment_method_id.clone(),
            ),
            ("confirm".to_string(), request.confirm.to_string()),
        ];
        if request.off_session {
            form.push(("off_session".to_string(), "true".to_string()));
        }
        for (key, value) in request.metadata() {
            form.push((format!("metadata[{key}]"), value));
        }

        let intent: StripePaymentIntent = self.stripe_request("/payment_intents", &form).await?;
        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            status: intent.status,
        })
    }

    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, ProviderError> {
        debug!(intent_id = %intent_id, "Confirming Stripe payment intent");

        let intent: StripePaymentIntent = self
            .stripe_request(&format!("/payment_intents/{intent_id}/confirm"), &[])
            .await?;
        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            status: intent.status,
        })
    }
}

// Stripe API response types

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeSetupIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
}
