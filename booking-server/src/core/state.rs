use std::sync::Arc;

use crate::booking::BookingService;
use crate::cancellation::CancellationService;
use crate::core::Config;
use crate::db::BookingStore;
use crate::discount::DiscountEngine;
use crate::notify::{self, LogNotifier, Notification, Notifier};
use crate::payments::{PaymentProvider, PaymentService, StripeGateway, WebhookVerifier};

/// Shared server state: configuration plus one instance of each service,
/// all over the same store. Cloning is shallow (`Arc` everywhere), so
/// handlers can take it by value.
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: BookingStore,
    pub bookings: BookingService,
    pub payments: PaymentService,
    pub discounts: DiscountEngine,
    pub cancellations: CancellationService,
    pub webhook_verifier: WebhookVerifier,
    notifier: Arc<dyn Notifier>,
}

impl ServerState {
    /// Open the database and wire production collaborators
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        let store = BookingStore::open(config.database_file())?;
        let provider: Arc<dyn PaymentProvider> =
            Arc::new(StripeGateway::new(config.stripe_secret_key.clone()));
        Ok(Self::assemble(
            config.clone(),
            store,
            provider,
            Arc::new(LogNotifier),
        ))
    }

    /// Wire services over the given collaborators. Tests inject a fake
    /// provider/notifier through here.
    pub fn assemble(
        config: Config,
        store: BookingStore,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let payments = PaymentService::new(store.clone(), provider, config.currency.clone());
        let bookings = BookingService::new(store.clone(), config.free_cancellation_hours);
        let discounts = DiscountEngine::new(store.clone());
        let cancellations =
            CancellationService::new(store.clone(), payments.clone(), config.cancellation_fee);
        let webhook_verifier = WebhookVerifier::new(&config.stripe_webhook_secret);

        Self {
            config,
            store,
            bookings,
            payments,
            discounts,
            cancellations,
            webhook_verifier,
            notifier,
        }
    }

    /// Fire-and-forget notification dispatch, after the transition committed
    pub fn notify(&self, notification: Notification) {
        notify::dispatch(self.notifier.clone(), notification);
    }
}
