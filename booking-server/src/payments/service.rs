//! Payment reconciliation service
//!
//! Orchestrates the two-phase payment flow: card authorization against a
//! provider customer profile, invoice finalization, charge intent creation,
//! capture, and idempotent application of asynchronous provider events.
//!
//! Discipline: provider calls happen outside any write transaction (single
//! bounded round trips, retried at the caller's discretion); every local
//! mutation re-reads current state inside the write transaction it commits,
//! and a state that already reflects the desired outcome is reported as
//! success, not re-executed.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use shared::models::{Booking, BookingStatus, PaymentRecord, PaymentStatus};
use shared::util::now;

use crate::booking::{BookingError, BookingResult};
use crate::db::BookingStore;
use crate::money;

use super::provider::{ChargeRequest, PaymentIntent, PaymentProvider, SetupIntent};
use super::webhook::{WebhookEvent, WebhookEventKind};

/// Admin-approved final invoice figures
#[derive(Debug, Clone)]
pub struct InvoiceFigures {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: Option<String>,
}

/// Result of a capture attempt
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Funds captured and both rows committed together
    Captured {
        booking: Booking,
        payment: PaymentRecord,
    },
    /// The booking was already `PAID`; nothing was charged or written
    AlreadyPaid(Booking),
}

/// What applying a webhook event did
#[derive(Debug, PartialEq, Eq)]
pub enum EventDisposition {
    /// State changed; the named notification should be dispatched
    Applied(AppliedEvent),
    /// Exact redelivery or state already reflected the event; no side effects
    Duplicate,
    /// Unrecognized kind, missing/unknown booking id, or unexpected state
    Ignored,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AppliedEvent {
    CardAuthorized,
    PaymentSucceeded,
}

/// Payment reconciliation core
#[derive(Clone)]
pub struct PaymentService {
    store: BookingStore,
    provider: Arc<dyn PaymentProvider>,
    currency: String,
}

impl PaymentService {
    pub fn new(store: BookingStore, provider: Arc<dyn PaymentProvider>, currency: String) -> Self {
        Self {
            store,
            provider,
            currency,
        }
    }

    /// Begin card collection: ensure a provider customer exists for the
    /// booking and open a setup intent. Does not change booking status.
    pub async fn start_card_setup(&self, booking_id: u64) -> BookingResult<SetupIntent> {
        let booking = self.require_booking(booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }

        let customer_id = self.ensure_provider_customer(&booking).await?;
        let setup = self
            .provider
            .create_setup_intent(&customer_id, booking_id)
            .await?;

        let txn = self.store.begin_write()?;
        {
            let mut payment = self
                .store
                .load_payment(&txn, booking_id)?
                .unwrap_or_else(|| PaymentRecord::new(booking_id, &self.currency, now()));
            payment.provider_customer_id = Some(customer_id);
            payment.updated_at = now();
            self.store.store_payment(&txn, &payment)?;
        }
        txn.commit().map_err(crate::db::StorageError::from)?;

        Ok(setup)
    }

    /// Record an authorized payment method on the booking's payment row.
    /// Creates the row lazily; does not change booking status.
    pub async fn authorize_card(
        &self,
        booking_id: u64,
        payment_method_id: &str,
    ) -> BookingResult<PaymentRecord> {
        if payment_method_id.is_empty() {
            return Err(BookingError::Validation(
                "payment method id must not be empty".to_string(),
            ));
        }
        let booking = self.require_booking(booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }

        let customer_id = self.ensure_provider_customer(&booking).await?;

        let txn = self.store.begin_write()?;
        let payment = {
            let mut payment = self
                .store
                .load_payment(&txn, booking_id)?
                .unwrap_or_else(|| PaymentRecord::new(booking_id, &self.currency, now()));
            payment.provider_customer_id = Some(customer_id);
            payment.provider_payment_method_id = Some(payment_method_id.to_string());
            payment.status = PaymentStatus::Authorized;
            payment.updated_at = now();
            self.store.store_payment(&txn, &payment)?;
            payment
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, "Payment method authorized");
        Ok(payment)
    }

    /// Finalize the invoice: validate figures, upsert the payment row, and
    /// drive the booking to `INVOICED`. Fails closed on a cancelled booking.
    pub fn finalize_invoice(
        &self,
        booking_id: u64,
        figures: InvoiceFigures,
    ) -> BookingResult<(Booking, PaymentRecord)> {
        money::validate_figures(figures.subtotal, figures.tax, figures.total)?;

        let txn = self.store.begin_write()?;
        let (booking, payment) = {
            let mut booking = self.store.load_booking(&txn, booking_id)?;
            if booking.status == BookingStatus::Cancelled {
                return Err(BookingError::AlreadyCancelled(booking_id));
            }
            booking.status.check_transition(BookingStatus::Invoiced)?;

            let mut payment = self
                .store
                .load_payment(&txn, booking_id)?
                .unwrap_or_else(|| PaymentRecord::new(booking_id, &self.currency, now()));
            payment.subtotal = figures.subtotal;
            payment.tax = figures.tax;
            payment.total = figures.total;
            if let Some(currency) = figures.currency {
                payment.currency = currency;
            }
            payment.status = PaymentStatus::ReadyForPayment;
            payment.updated_at = now();
            self.store.store_payment(&txn, &payment)?;

            booking.status = BookingStatus::Invoiced;
            booking.updated_at = now();
            self.store.store_booking(&txn, &booking)?;

            (booking, payment)
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, total = %payment.total, "Invoice finalized");
        Ok((booking, payment))
    }

    /// Create (or recreate) the provider charge intent for the finalized
    /// amount. Safe to call repeatedly: the stored intent id is overwritten,
    /// never accumulated, so a page reload cannot leave duplicate intents
    /// attached to the booking.
    pub async fn create_charge_intent(
        &self,
        booking_id: u64,
    ) -> BookingResult<(PaymentIntent, PaymentRecord)> {
        let booking = self.require_booking(booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }
        if booking.status != BookingStatus::Invoiced {
            return Err(BookingError::Conflict(format!(
                "charge intent requires an invoiced booking, current status {}",
                booking.status
            )));
        }

        let payment = self
            .store
            .get_payment(booking_id)?
            .ok_or(BookingError::PaymentNotFound(booking_id))?;
        let (customer_id, payment_method_id) = match (
            &payment.provider_customer_id,
            &payment.provider_payment_method_id,
        ) {
            (Some(c), Some(m)) => (c.clone(), m.clone()),
            _ => return Err(BookingError::MissingPaymentMethod(booking_id)),
        };
        if payment.total <= Decimal::ZERO {
            return Err(BookingError::Validation(
                "invoice total must be greater than zero".to_string(),
            ));
        }

        let request = ChargeRequest {
            amount_minor: money::to_minor_units(payment.total)?,
            currency: payment.currency.clone(),
            customer_id,
            payment_method_id,
            confirm: false,
            off_session: false,
            booking_id,
        };
        let intent = self.provider.create_payment_intent(&request).await?;

        let txn = self.store.begin_write()?;
        let payment = {
            let mut payment = self
                .store
                .load_payment(&txn, booking_id)?
                .ok_or(BookingError::PaymentNotFound(booking_id))?;
            payment.provider_payment_intent_id = Some(intent.id.clone());
            payment.status = PaymentStatus::RequiresConfirmation;
            payment.updated_at = now();
            self.store.store_payment(&txn, &payment)?;
            payment
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, "Charge intent created");
        Ok((intent, payment))
    }

    /// Capture the stored intent. On provider success, the payment status
    /// and the `PAID` booking status commit in a single transaction; a
    /// booking observed as already `PAID` is a no-op success, so exactly one
    /// of two racing capture calls performs the charge.
    pub async fn confirm_capture(&self, booking_id: u64) -> BookingResult<CaptureOutcome> {
        let booking = self.require_booking(booking_id)?;
        if booking.status == BookingStatus::Paid {
            return Ok(CaptureOutcome::AlreadyPaid(booking));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }

        let payment = self
            .store
            .get_payment(booking_id)?
            .ok_or(BookingError::PaymentNotFound(booking_id))?;
        let intent_id = payment.provider_payment_intent_id.clone().ok_or_else(|| {
            BookingError::Validation("no charge intent exists for this booking".to_string())
        })?;
        // Last check before money moves; the in-txn re-read below still
        // guards the commit
        booking.status.check_transition(BookingStatus::Paid)?;

        let intent = self.provider.confirm_payment_intent(&intent_id).await?;

        let txn = self.store.begin_write()?;
        let outcome = {
            let mut booking = self.store.load_booking(&txn, booking_id)?;
            if booking.status == BookingStatus::Paid {
                // Lost the local race; the winner already committed.
                return Ok(CaptureOutcome::AlreadyPaid(booking));
            }
            booking.status.check_transition(BookingStatus::Paid)?;

            let mut payment = self
                .store
                .load_payment(&txn, booking_id)?
                .ok_or(BookingError::PaymentNotFound(booking_id))?;
            payment.status = PaymentStatus::Other(intent.status.clone());
            payment.updated_at = now();
            self.store.store_payment(&txn, &payment)?;

            booking.status = BookingStatus::Paid;
            booking.updated_at = now();
            self.store.store_booking(&txn, &booking)?;

            CaptureOutcome::Captured { booking, payment }
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, "Payment captured");
        Ok(outcome)
    }

    /// Apply an asynchronous provider event. Idempotent under at-least-once
    /// delivery: exact redelivery is caught by the event id, and a state
    /// that already reflects the event is a no-op success so no duplicate
    /// notification is produced.
    pub fn apply_event(&self, event: &WebhookEvent) -> BookingResult<EventDisposition> {
        let Some(booking_id) = event.booking_id else {
            warn!(event_id = %event.id, "Dropping webhook event without booking id");
            return Ok(EventDisposition::Ignored);
        };

        let txn = self.store.begin_write()?;
        if !self.store.mark_event_processed(&txn, &event.id)? {
            info!(event_id = %event.id, booking_id, "Duplicate webhook event, skipping");
            return Ok(EventDisposition::Duplicate);
        }

        let booking = match self.store.load_booking(&txn, booking_id) {
            Ok(b) => b,
            Err(crate::db::StorageError::BookingNotFound(_)) => {
                warn!(event_id = %event.id, booking_id, "Webhook event for unknown booking");
                return Ok(EventDisposition::Ignored);
            }
            Err(e) => return Err(e.into()),
        };

        let disposition = match event.kind {
            WebhookEventKind::SetupIntentSucceeded => {
                let mut payment = self
                    .store
                    .load_payment(&txn, booking_id)?
                    .unwrap_or_else(|| PaymentRecord::new(booking_id, &self.currency, now()));

                let already_recorded = payment.provider_payment_method_id.is_some()
                    && payment.provider_payment_method_id == event.payment_method_id;
                if already_recorded {
                    EventDisposition::Duplicate
                } else {
                    if let Some(customer) = &event.customer_id {
                        payment.provider_customer_id = Some(customer.clone());
                    }
                    payment.provider_payment_method_id = event.payment_method_id.clone();
                    // Only lift Pending; later statuses already imply authorization
                    if payment.status == PaymentStatus::Pending {
                        payment.status = PaymentStatus::Authorized;
                    }
                    payment.updated_at = now();
                    self.store.store_payment(&txn, &payment)?;
                    EventDisposition::Applied(AppliedEvent::CardAuthorized)
                }
            }
            WebhookEventKind::PaymentIntentSucceeded => {
                if booking.status == BookingStatus::Paid {
                    EventDisposition::Duplicate
                } else if booking.status.check_transition(BookingStatus::Paid).is_ok() {
                    let mut payment = self
                        .store
                        .load_payment(&txn, booking_id)?
                        .unwrap_or_else(|| PaymentRecord::new(booking_id, &self.currency, now()));
                    payment.provider_payment_intent_id = Some(event.object_id.clone());
                    payment.status = PaymentStatus::Other(
                        event.status.clone().unwrap_or_else(|| "succeeded".to_string()),
                    );
                    payment.updated_at = now();
                    self.store.store_payment(&txn, &payment)?;

                    let mut booking = booking;
                    booking.status = BookingStatus::Paid;
                    booking.updated_at = now();
                    self.store.store_booking(&txn, &booking)?;
                    EventDisposition::Applied(AppliedEvent::PaymentSucceeded)
                } else if booking.status == BookingStatus::Cancelled {
                    // Funds were captured for a booking cancelled in the
                    // meantime; keep the intent id on record for manual
                    // refund, without touching booking status
                    warn!(
                        event_id = %event.id,
                        booking_id,
                        intent = %event.object_id,
                        "payment_intent.succeeded for cancelled booking; recording intent"
                    );
                    let mut payment = self
                        .store
                        .load_payment(&txn, booking_id)?
                        .unwrap_or_else(|| PaymentRecord::new(booking_id, &self.currency, now()));
                    payment.provider_payment_intent_id = Some(event.object_id.clone());
                    payment.updated_at = now();
                    self.store.store_payment(&txn, &payment)?;
                    EventDisposition::Ignored
                } else {
                    warn!(
                        event_id = %event.id,
                        booking_id,
                        status = %booking.status,
                        "payment_intent.succeeded for booking in unexpected state"
                    );
                    return Ok(EventDisposition::Ignored);
                }
            }
            WebhookEventKind::Unknown(ref kind) => {
                info!(event_id = %event.id, kind = %kind, "Ignoring unhandled webhook event kind");
                return Ok(EventDisposition::Ignored);
            }
        };

        txn.commit().map_err(crate::db::StorageError::from)?;
        Ok(disposition)
    }

    /// Off-session charge against the stored card (cancellation fee). Pure
    /// provider interaction; the caller owns the transactional bookkeeping
    /// so fee collection and cancellation commit together.
    pub async fn charge_off_session(
        &self,
        payment: &PaymentRecord,
        amount: Decimal,
    ) -> BookingResult<PaymentIntent> {
        let (customer_id, payment_method_id) = match (
            &payment.provider_customer_id,
            &payment.provider_payment_method_id,
        ) {
            (Some(c), Some(m)) => (c.clone(), m.clone()),
            _ => return Err(BookingError::MissingPaymentMethod(payment.booking_id)),
        };

        let request = ChargeRequest {
            amount_minor: money::to_minor_units(amount)?,
            currency: payment.currency.clone(),
            customer_id,
            payment_method_id,
            confirm: true,
            off_session: true,
            booking_id: payment.booking_id,
        };
        Ok(self.provider.create_payment_intent(&request).await?)
    }

    fn require_booking(&self, booking_id: u64) -> BookingResult<Booking> {
        self.store
            .get_booking(booking_id)?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// Reuse the stored provider customer id or create one from the
    /// booking's customer profile
    async fn ensure_provider_customer(&self, booking: &Booking) -> BookingResult<String> {
        if let Some(payment) = self.store.get_payment(booking.id)? {
            if let Some(id) = payment.provider_customer_id {
                return Ok(id);
            }
        }
        let customer = self
            .store
            .get_customer(&booking.customer_email)?
            .ok_or_else(|| {
                BookingError::Validation(format!(
                    "no customer profile for {}",
                    booking.customer_email
                ))
            })?;
        let id = self
            .provider
            .create_customer(&customer.email, &customer.name)
            .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::mock::MockProvider;
    use chrono::{Duration, Utc};
    use shared::models::{Address, BookingItem, Customer, ItemSize};
    use std::sync::atomic::Ordering;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn seed_booking(store: &BookingStore, id: u64, status: BookingStatus) {
        let now_ts = Utc::now();
        let pickup = now_ts + Duration::hours(48);
        let booking = Booking {
            id,
            status,
            customer_email: "a@example.com".to_string(),
            pickup_address: Address {
                line1: "1 Main St".to_string(),
                line2: None,
                city: "Vancouver".to_string(),
                province: "BC".to_string(),
                postal_code: "V5K 0A1".to_string(),
            },
            delivery_address: None,
            delivery_required: false,
            items: vec![BookingItem {
                name: "Sofa".to_string(),
                size: ItemSize::Large,
                quantity: 1,
                photo_url: None,
                description: None,
            }],
            preferred_datetime: pickup,
            free_cancellation_deadline: pickup - Duration::hours(24),
            cancelled_at: None,
            cancellation_fee: None,
            created_at: now_ts,
            updated_at: now_ts,
        };
        let customer = Customer {
            email: "a@example.com".to_string(),
            name: "Alex".to_string(),
            phone: None,
            created_at: now_ts,
            updated_at: now_ts,
        };
        let txn = store.begin_write().unwrap();
        store.store_booking(&txn, &booking).unwrap();
        store.store_customer(&txn, &customer).unwrap();
        txn.commit().unwrap();
    }

    fn seed_card(store: &BookingStore, booking_id: u64) {
        let mut payment = PaymentRecord::new(booking_id, "CAD", Utc::now());
        payment.provider_customer_id = Some("cus_seed".to_string());
        payment.provider_payment_method_id = Some("pm_seed".to_string());
        payment.status = PaymentStatus::Authorized;
        let txn = store.begin_write().unwrap();
        store.store_payment(&txn, &payment).unwrap();
        txn.commit().unwrap();
    }

    fn service(store: &BookingStore) -> (PaymentService, Arc<MockProvider>) {
        let provider = Arc::new(MockProvider::new());
        let service = PaymentService::new(store.clone(), provider.clone(), "CAD".to_string());
        (service, provider)
    }

    fn figures(subtotal: &str, tax: &str, total: &str) -> InvoiceFigures {
        InvoiceFigures {
            subtotal: dec(subtotal),
            tax: dec(tax),
            total: dec(total),
            currency: None,
        }
    }

    fn event(id: &str, kind: WebhookEventKind, booking_id: u64) -> WebhookEvent {
        WebhookEvent {
            id: id.to_string(),
            kind,
            booking_id: Some(booking_id),
            object_id: "obj_1".to_string(),
            customer_id: Some("cus_evt".to_string()),
            payment_method_id: Some("pm_evt".to_string()),
            status: Some("succeeded".to_string()),
            created: 1_700_000_000,
        }
    }

    #[test]
    fn finalize_moves_booking_to_invoiced() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Confirmed);
        let (service, _) = service(&store);

        let (booking, payment) = service
            .finalize_invoice(1, figures("50.00", "6.00", "56.00"))
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Invoiced);
        assert_eq!(payment.status, PaymentStatus::ReadyForPayment);
        assert_eq!(payment.total, dec("56.00"));

        // Re-finalizing with corrected figures is legal
        let (booking, payment) = service
            .finalize_invoice(1, figures("60.00", "7.20", "67.20"))
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Invoiced);
        assert_eq!(payment.total, dec("67.20"));
    }

    #[test]
    fn finalize_rejects_inconsistent_totals() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Confirmed);
        let (service, _) = service(&store);

        let result = service.finalize_invoice(1, figures("50.00", "6.50", "56.60"));
        assert!(matches!(result, Err(BookingError::Validation(_))));
        assert_eq!(
            store.get_booking(1).unwrap().unwrap().status,
            BookingStatus::Confirmed
        );
    }

    #[test]
    fn finalize_tolerates_rounding_within_a_cent() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Confirmed);
        let (service, _) = service(&store);

        service
            .finalize_invoice(1, figures("50.00", "6.50", "56.51"))
            .unwrap();
    }

    #[test]
    fn finalize_fails_closed_on_cancelled_booking() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Cancelled);
        let (service, _) = service(&store);

        let result = service.finalize_invoice(1, figures("50.00", "6.00", "56.00"));
        assert!(matches!(result, Err(BookingError::AlreadyCancelled(1))));
    }

    #[tokio::test]
    async fn charge_intent_requires_stored_card() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Confirmed);
        let (service, _) = service(&store);
        service
            .finalize_invoice(1, figures("50.00", "6.00", "56.00"))
            .unwrap();

        let result = service.create_charge_intent(1).await;
        assert!(matches!(result, Err(BookingError::MissingPaymentMethod(1))));
    }

    #[tokio::test]
    async fn charge_intent_requires_an_invoiced_booking() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Confirmed);
        // Payment carries a card and figures, but finalize never ran
        let mut payment = PaymentRecord::new(1, "CAD", Utc::now());
        payment.provider_customer_id = Some("cus_seed".to_string());
        payment.provider_payment_method_id = Some("pm_seed".to_string());
        payment.total = dec("56.00");
        let txn = store.begin_write().unwrap();
        store.store_payment(&txn, &payment).unwrap();
        txn.commit().unwrap();
        let (service, provider) = service(&store);

        let result = service.create_charge_intent(1).await;
        assert!(matches!(result, Err(BookingError::Conflict(_))));
        assert!(provider.charges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn capture_checks_status_before_charging() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Quoted);
        let mut payment = PaymentRecord::new(1, "CAD", Utc::now());
        payment.provider_customer_id = Some("cus_seed".to_string());
        payment.provider_payment_method_id = Some("pm_seed".to_string());
        payment.provider_payment_intent_id = Some("pi_stale".to_string());
        let txn = store.begin_write().unwrap();
        store.store_payment(&txn, &payment).unwrap();
        txn.commit().unwrap();
        let (service, provider) = service(&store);

        let result = service.confirm_capture(1).await;
        assert!(matches!(result, Err(BookingError::InvalidTransition(_))));
        assert_eq!(provider.confirm_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recreating_charge_intent_overwrites_stored_id() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Confirmed);
        seed_card(&store, 1);
        let (service, provider) = service(&store);
        service
            .finalize_invoice(1, figures("50.00", "6.00", "56.00"))
            .unwrap();

        let (first, _) = service.create_charge_intent(1).await.unwrap();
        let (second, payment) = service.create_charge_intent(1).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(payment.provider_payment_intent_id, Some(second.id));
        assert_eq!(payment.status, PaymentStatus::RequiresConfirmation);

        let charges = provider.charges.lock().unwrap();
        assert_eq!(charges.len(), 2);
        assert_eq!(charges[0].amount_minor, 5600);
        assert!(!charges[0].off_session);
    }

    #[tokio::test]
    async fn capture_commits_booking_and_payment_together() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Confirmed);
        seed_card(&store, 1);
        let (service, _) = service(&store);
        service
            .finalize_invoice(1, figures("50.00", "6.00", "56.00"))
            .unwrap();
        service.create_charge_intent(1).await.unwrap();

        let outcome = service.confirm_capture(1).await.unwrap();
        assert!(matches!(outcome, CaptureOutcome::Captured { .. }));

        let booking = store.get_booking(1).unwrap().unwrap();
        let payment = store.get_payment(1).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Paid);
        assert_eq!(payment.status, PaymentStatus::Other("succeeded".to_string()));
    }

    #[tokio::test]
    async fn second_capture_is_a_no_op() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Confirmed);
        seed_card(&store, 1);
        let (service, provider) = service(&store);
        service
            .finalize_invoice(1, figures("50.00", "6.00", "56.00"))
            .unwrap();
        service.create_charge_intent(1).await.unwrap();

        service.confirm_capture(1).await.unwrap();
        let outcome = service.confirm_capture(1).await.unwrap();
        assert!(matches!(outcome, CaptureOutcome::AlreadyPaid(_)));
        assert_eq!(provider.confirm_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn redelivered_event_id_is_skipped() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Invoiced);
        seed_card(&store, 1);
        let (service, _) = service(&store);

        let evt = event("evt_pi_1", WebhookEventKind::PaymentIntentSucceeded, 1);
        assert_eq!(
            service.apply_event(&evt).unwrap(),
            EventDisposition::Applied(AppliedEvent::PaymentSucceeded)
        );
        assert_eq!(
            service.apply_event(&evt).unwrap(),
            EventDisposition::Duplicate
        );
        assert_eq!(
            store.get_booking(1).unwrap().unwrap().status,
            BookingStatus::Paid
        );
    }

    #[test]
    fn equivalent_event_under_new_id_is_a_no_op() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Invoiced);
        seed_card(&store, 1);
        let (service, _) = service(&store);

        let first = event("evt_pi_1", WebhookEventKind::PaymentIntentSucceeded, 1);
        let second = event("evt_pi_2", WebhookEventKind::PaymentIntentSucceeded, 1);
        service.apply_event(&first).unwrap();
        assert_eq!(
            service.apply_event(&second).unwrap(),
            EventDisposition::Duplicate
        );
    }

    #[test]
    fn setup_event_records_payment_method() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Quoted);
        let (service, _) = service(&store);

        let evt = event("evt_seti_1", WebhookEventKind::SetupIntentSucceeded, 1);
        assert_eq!(
            service.apply_event(&evt).unwrap(),
            EventDisposition::Applied(AppliedEvent::CardAuthorized)
        );

        let payment = store.get_payment(1).unwrap().unwrap();
        assert_eq!(payment.provider_customer_id, Some("cus_evt".to_string()));
        assert_eq!(payment.provider_payment_method_id, Some("pm_evt".to_string()));
        assert_eq!(payment.status, PaymentStatus::Authorized);
    }

    #[test]
    fn payment_event_in_unexpected_state_is_absorbed() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Received);
        let (service, _) = service(&store);

        let evt = event("evt_pi_1", WebhookEventKind::PaymentIntentSucceeded, 1);
        assert_eq!(service.apply_event(&evt).unwrap(), EventDisposition::Ignored);
        assert_eq!(
            store.get_booking(1).unwrap().unwrap().status,
            BookingStatus::Received
        );
    }

    #[test]
    fn payment_event_for_cancelled_booking_records_intent() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_booking(&store, 1, BookingStatus::Cancelled);
        seed_card(&store, 1);
        let (service, _) = service(&store);

        let evt = event("evt_pi_1", WebhookEventKind::PaymentIntentSucceeded, 1);
        assert_eq!(service.apply_event(&evt).unwrap(), EventDisposition::Ignored);

        let booking = store.get_booking(1).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        let payment = store.get_payment(1).unwrap().unwrap();
        assert_eq!(payment.provider_payment_intent_id, Some("obj_1".to_string()));

        // The recording committed, so redelivery is an exact duplicate
        assert_eq!(
            service.apply_event(&evt).unwrap(),
            EventDisposition::Duplicate
        );
    }

    #[test]
    fn event_for_unknown_booking_is_absorbed() {
        let store = BookingStore::open_in_memory().unwrap();
        let (service, _) = service(&store);

        let evt = event("evt_pi_1", WebhookEventKind::PaymentIntentSucceeded, 999);
        assert_eq!(service.apply_event(&evt).unwrap(), EventDisposition::Ignored);
    }
}
