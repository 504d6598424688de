//! In-process payment provider fake for unit tests

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::provider::{ChargeRequest, PaymentIntent, PaymentProvider, ProviderError, SetupIntent};

/// Deterministic [`PaymentProvider`] that records calls and can be primed
/// to fail the next request
#[derive(Default)]
pub struct MockProvider {
    seq: AtomicU64,
    pub confirm_calls: AtomicUsize,
    pub charges: Mutex<Vec<ChargeRequest>>,
    fail_next: Mutex<Option<ProviderError>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, err: ProviderError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    fn check_failure(&self) -> Result<(), ProviderError> {
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_customer(&self, _email: &str, _name: &str) -> Result<String, ProviderError> {
        self.check_failure()?;
        Ok(format!("cus_mock_{}", self.next()))
    }

    async fn create_setup_intent(
        &self,
        customer_id: &str,
        _booking_id: u64,
    ) -> Result<SetupIntent, ProviderError> {
        self.check_failure()?;
        Ok(SetupIntent {
            id: format!("seti_mock_{}", self.next()),
            client_secret: Some(format!("seti_secret_{customer_id}")),
            status: "requires_payment_method".to_string(),
        })
    }

    async fn create_payment_intent(
        &self,
        request: &ChargeRequest,
    ) -> Result<PaymentIntent, ProviderError> {
        self.check_failure()?;
        self.charges.lock().unwrap().push(request.clone());
        let status = if request.confirm {
            "succeeded"
        } else {
            "requires_confirmation"
        };
        Ok(PaymentIntent {
            id: format!("pi_mock_{}", self.next()),
            client_secret: Some("pi_secret".to_string()),
            status: status.to_string(),
        })
    }

    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, ProviderError> {
        self.check_failure()?;
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentIntent {
            id: intent_id.to_string(),
            client_secret: None,
            status: "succeeded".to_string(),
        })
    }
}
