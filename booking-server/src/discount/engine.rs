//! Discount code application
//!
//! Applies a validated code to the booking's quotation, always recomputing
//! from the preserved pre-discount figures so a repeated apply of the same
//! code converges instead of compounding. Enforcing "at most one active
//! code" belongs to the caller, which checks the quotation before invoking
//! apply; the engine itself only validates the code and does the math.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use tracing::info;

use shared::models::{BookingStatus, DiscountCode, DiscountType, Quotation};
use shared::util::now;

use crate::booking::{BookingError, BookingResult};
use crate::db::BookingStore;
use crate::money;

/// Day-boundary offset for discount validity windows. Dates on codes are
/// calendar days in UTC-8: a code starting 2026-03-01 becomes valid at
/// 2026-03-01T00:00:00-08:00 and one expiring 2026-03-31 lapses after
/// 2026-03-31T23:59:59-08:00.
fn window_offset() -> FixedOffset {
    FixedOffset::west_opt(8 * 3600).expect("UTC-8 is a valid offset")
}

/// Discount application engine
#[derive(Clone)]
pub struct DiscountEngine {
    store: BookingStore,
}

impl DiscountEngine {
    pub fn new(store: BookingStore) -> Self {
        Self { store }
    }

    /// Apply a code to the booking's quotation, recomputing figures from
    /// the pre-discount originals
    pub fn apply(&self, booking_id: u64, code: &str) -> BookingResult<Quotation> {
        let now_ts = now();
        let discount_code = self
            .store
            .get_discount_code(code)?
            .ok_or_else(|| BookingError::DiscountNotFound(code.to_string()))?;
        validate_code(&discount_code, now_ts)?;

        let txn = self.store.begin_write()?;
        let quotation = {
            let booking = self.store.load_booking(&txn, booking_id)?;
            if booking.status == BookingStatus::Cancelled {
                return Err(BookingError::AlreadyCancelled(booking_id));
            }

            let mut quotation = self
                .store
                .load_quotation(&txn, booking_id)?
                .ok_or(BookingError::QuotationNotFound(booking_id))?;

            let base_subtotal = quotation.original_subtotal;
            let base_tax = quotation.original_tax;
            let tax_rate = if base_subtotal > Decimal::ZERO {
                base_tax / base_subtotal
            } else {
                money::FALLBACK_TAX_RATE
            };

            let raw = match discount_code.discount_type {
                DiscountType::FixedAmount => discount_code.value,
                DiscountType::Percentage => {
                    base_subtotal * discount_code.value / Decimal::ONE_HUNDRED
                }
            };
            // Clamp so the discounted subtotal can never go negative
            let discount = money::round_money(raw.min(base_subtotal));

            let new_subtotal = base_subtotal - discount;
            let new_tax = money::multiply_by_rate(new_subtotal, tax_rate);

            quotation.subtotal = new_subtotal;
            quotation.tax = new_tax;
            quotation.total = new_subtotal + new_tax;
            quotation.discount_code_id = Some(discount_code.code.clone());
            quotation.discount_amount = Some(discount);
            quotation.updated_at = now_ts;
            self.store.store_quotation(&txn, &quotation)?;
            quotation
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, code = %code, amount = %quotation.discount_amount.unwrap_or_default(), "Discount applied");
        Ok(quotation)
    }

    /// Remove any applied code, restoring the preserved original figures.
    /// Removing when no code is applied is a no-op success.
    pub fn remove(&self, booking_id: u64) -> BookingResult<Quotation> {
        let txn = self.store.begin_write()?;
        let mut quotation = self
            .store
            .load_quotation(&txn, booking_id)?
            .ok_or(BookingError::QuotationNotFound(booking_id))?;
        if !quotation.has_discount() {
            return Ok(quotation);
        }

        quotation.subtotal = quotation.original_subtotal;
        quotation.tax = quotation.original_tax;
        quotation.total = quotation.original_total;
        quotation.discount_code_id = None;
        quotation.discount_amount = None;
        quotation.updated_at = now();
        self.store.store_quotation(&txn, &quotation)?;
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, "Discount removed");
        Ok(quotation)
    }
}

/// Active flag and calendar-day validity window
fn validate_code(code: &DiscountCode, now: DateTime<Utc>) -> BookingResult<()> {
    if !code.is_active {
        return Err(BookingError::DiscountInactive(code.code.clone()));
    }
    let today = now.with_timezone(&window_offset()).date_naive();
    if let Some(starts) = code.starts_at {
        if today < starts {
            return Err(BookingError::DiscountNotYetValid(code.code.clone()));
        }
    }
    if let Some(expires) = code.expires_at {
        if today > expires {
            return Err(BookingError::DiscountExpired(code.code.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared::models::{Address, Booking, BookingItem, ItemSize};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn seed_quoted_booking(store: &BookingStore, id: u64, subtotal: &str, tax: &str, total: &str) {
        let now_ts = Utc::now();
        let pickup = now_ts + Duration::hours(48);
        let booking = Booking {
            id,
            status: BookingStatus::Quoted,
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
        let quotation = Quotation::new(id, dec(subtotal), dec(tax), dec(total), now_ts);
        let txn = store.begin_write().unwrap();
        store.store_booking(&txn, &booking).unwrap();
        store.store_quotation(&txn, &quotation).unwrap();
        txn.commit().unwrap();
    }

    fn code(
        name: &str,
        discount_type: DiscountType,
        value: &str,
        is_active: bool,
    ) -> DiscountCode {
        DiscountCode {
            code: name.to_string(),
            discount_type,
            value: dec(value),
            is_active,
            starts_at: None,
            expires_at: None,
        }
    }

    fn engine_with(store: &BookingStore) -> DiscountEngine {
        DiscountEngine::new(store.clone())
    }

    #[test]
    fn percentage_discount_recomputes_tax_at_base_rate() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_quoted_booking(&store, 1, "100.00", "12.00", "112.00");
        store
            .store_discount_code(&code("SPRING20", DiscountType::Percentage, "20", true))
            .unwrap();
        let engine = engine_with(&store);

        let quotation = engine.apply(1, "SPRING20").unwrap();
        assert_eq!(quotation.discount_amount, Some(dec("20.00")));
        assert_eq!(quotation.subtotal, dec("80.00"));
        assert_eq!(quotation.tax, dec("9.60"));
        assert_eq!(quotation.total, dec("89.60"));
        assert_eq!(quotation.original_subtotal, dec("100.00"));
        assert_eq!(quotation.original_total, dec("112.00"));
    }

    #[test]
    fn fixed_discount_is_clamped_to_subtotal() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_quoted_booking(&store, 1, "100.00", "12.00", "112.00");
        store
            .store_discount_code(&code("BIG", DiscountType::FixedAmount, "250.00", true))
            .unwrap();
        let engine = engine_with(&store);

        let quotation = engine.apply(1, "BIG").unwrap();
        assert_eq!(quotation.discount_amount, Some(dec("100.00")));
        assert_eq!(quotation.subtotal, Decimal::ZERO);
        assert_eq!(quotation.tax, Decimal::ZERO);
        assert_eq!(quotation.total, Decimal::ZERO);
    }

    #[test]
    fn reapplying_recomputes_from_originals() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_quoted_booking(&store, 1, "100.00", "12.00", "112.00");
        store
            .store_discount_code(&code("TEN", DiscountType::FixedAmount, "10.00", true))
            .unwrap();
        let engine = engine_with(&store);

        let first = engine.apply(1, "TEN").unwrap();
        let second = engine.apply(1, "TEN").unwrap();
        assert_eq!(first.subtotal, second.subtotal);
        assert_eq!(second.subtotal, dec("90.00"));
        assert_eq!(second.discount_amount, Some(dec("10.00")));
    }

    #[test]
    fn totals_stay_consistent_after_apply_and_remove() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_quoted_booking(&store, 1, "73.45", "8.81", "82.26");
        store
            .store_discount_code(&code("ODD", DiscountType::Percentage, "13", true))
            .unwrap();
        let engine = engine_with(&store);

        let discounted = engine.apply(1, "ODD").unwrap();
        assert!(money::approx_eq(
            discounted.subtotal + discounted.tax,
            discounted.total
        ));

        let restored = engine.remove(1).unwrap();
        assert_eq!(restored.subtotal, dec("73.45"));
        assert_eq!(restored.tax, dec("8.81"));
        assert_eq!(restored.total, dec("82.26"));
        assert!(restored.discount_code_id.is_none());
        assert!(restored.discount_amount.is_none());
    }

    #[test]
    fn remove_without_discount_is_a_no_op() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_quoted_booking(&store, 1, "50.00", "6.00", "56.00");
        let engine = engine_with(&store);

        let quotation = engine.remove(1).unwrap();
        assert_eq!(quotation.total, dec("56.00"));
    }

    #[test]
    fn inactive_and_out_of_window_codes_are_rejected() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_quoted_booking(&store, 1, "100.00", "12.00", "112.00");
        let engine = engine_with(&store);

        store
            .store_discount_code(&code("OFF", DiscountType::FixedAmount, "5.00", false))
            .unwrap();
        assert!(matches!(
            engine.apply(1, "OFF"),
            Err(BookingError::DiscountInactive(_))
        ));

        let today = Utc::now().with_timezone(&window_offset()).date_naive();
        let mut future = code("SOON", DiscountType::FixedAmount, "5.00", true);
        future.starts_at = Some(today + Duration::days(2));
        store.store_discount_code(&future).unwrap();
        assert!(matches!(
            engine.apply(1, "SOON"),
            Err(BookingError::DiscountNotYetValid(_))
        ));

        let mut lapsed = code("PAST", DiscountType::FixedAmount, "5.00", true);
        lapsed.expires_at = Some(today - Duration::days(1));
        store.store_discount_code(&lapsed).unwrap();
        assert!(matches!(
            engine.apply(1, "PAST"),
            Err(BookingError::DiscountExpired(_))
        ));

        // Boundary days themselves are inside the window
        let mut edge = code("EDGE", DiscountType::FixedAmount, "5.00", true);
        edge.starts_at = Some(today);
        edge.expires_at = Some(today);
        store.store_discount_code(&edge).unwrap();
        assert!(engine.apply(1, "EDGE").is_ok());
    }

    #[test]
    fn unknown_code_and_missing_quotation_are_reported() {
        let store = BookingStore::open_in_memory().unwrap();
        seed_quoted_booking(&store, 1, "100.00", "12.00", "112.00");
        let engine = engine_with(&store);

        assert!(matches!(
            engine.apply(1, "NOPE"),
            Err(BookingError::DiscountNotFound(_))
        ));

        store
            .store_discount_code(&code("TEN", DiscountType::FixedAmount, "10.00", true))
            .unwrap();
        assert!(matches!(
            engine.apply(99, "TEN"),
            Err(BookingError::BookingNotFound(99))
        ));
    }
}
