//! redb-based storage for the booking core
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `bookings` | booking id (u64) | `Booking` | Aggregate root |
//! | `customers` | email | `Customer` | Upsert-by-email |
//! | `quotations` | booking id | `Quotation` | 1:1 estimate snapshot |
//! | `payments` | booking id | `PaymentRecord` | 1:1 invoice + provider linkage |
//! | `discount_codes` | code | `DiscountCode` | Read-only for the core |
//! | `processed_events` | provider event id | `()` | Webhook redelivery check |
//! | `counters` | name | `u64` | Booking id sequence |
//!
//! All values are JSON-serialized. Mutations go through explicit
//! `WriteTransaction`s so multi-row updates (capture, cancellation) commit
//! atomically or not at all. redb admits a single write transaction at a
//! time, which serializes local writers; cross-writer status races are
//! handled by [`BookingStore::transition_status`] re-reading the current
//! status inside the transaction.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::models::{Booking, BookingStatus, Customer, DiscountCode, PaymentRecord, Quotation};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const BOOKINGS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("bookings");
const CUSTOMERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("customers");
const QUOTATIONS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("quotations");
const PAYMENTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("payments");
const DISCOUNT_CODES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("discount_codes");
const PROCESSED_EVENTS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("processed_events");
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const BOOKING_ID_KEY: &str = "booking_id";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Booking not found: {0}")]
    BookingNotFound(u64),

    #[error("Status precondition failed for booking {booking_id}: current {current}")]
    StatusConflict {
        booking_id: u64,
        current: BookingStatus,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Booking store backed by redb
///
/// redb commits are durable as soon as `commit()` returns (copy-on-write
/// with atomic pointer swap), so a capture or cancellation that has been
/// acknowledged survives a crash.
#[derive(Clone)]
pub struct BookingStore {
    db: Arc<Database>,
}

impl BookingStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(BOOKINGS_TABLE)?;
            let _ = txn.open_table(CUSTOMERS_TABLE)?;
            let _ = txn.open_table(QUOTATIONS_TABLE)?;
            let _ = txn.open_table(PAYMENTS_TABLE)?;
            let _ = txn.open_table(DISCOUNT_CODES_TABLE)?;
            let _ = txn.open_table(PROCESSED_EVENTS_TABLE)?;

            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            if counters.get(BOOKING_ID_KEY)?.is_none() {
                counters.insert(BOOKING_ID_KEY, 0u64)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence ==========

    /// Allocate the next booking id (increments within the transaction)
    pub fn next_booking_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let next = table
            .get(BOOKING_ID_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0)
            + 1;
        table.insert(BOOKING_ID_KEY, next)?;
        Ok(next)
    }

    // ========== Bookings ==========

    pub fn store_booking(&self, txn: &WriteTransaction, booking: &Booking) -> StorageResult<()> {
        let bytes = serde_json::to_vec(booking)?;
        let mut table = txn.open_table(BOOKINGS_TABLE)?;
        table.insert(booking.id, bytes.as_slice())?;
        Ok(())
    }

    /// Load a booking inside a write transaction, erroring if absent
    pub fn load_booking(&self, txn: &WriteTransaction, id: u64) -> StorageResult<Booking> {
        let table = txn.open_table(BOOKINGS_TABLE)?;
        let guard = table.get(id)?.ok_or(StorageError::BookingNotFound(id))?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    /// Read a booking outside any write transaction
    pub fn get_booking(&self, id: u64) -> StorageResult<Option<Booking>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOOKINGS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Conditional status transition: write only if the current status is in
    /// `expected`. Re-reads inside the transaction, so two concurrent writers
    /// cannot both apply conflicting transitions.
    pub fn transition_status(
        &self,
        txn: &WriteTransaction,
        booking_id: u64,
        expected: &[BookingStatus],
        to: BookingStatus,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StorageResult<Booking> {
        let mut booking = self.load_booking(txn, booking_id)?;
        if !expected.contains(&booking.status) {
            return Err(StorageError::StatusConflict {
                booking_id,
                current: booking.status,
            });
        }
        booking.status = to;
        booking.updated_at = now;
        self.store_booking(txn, &booking)?;
        Ok(booking)
    }

    // ========== Customers ==========

    pub fn store_customer(&self, txn: &WriteTransaction, customer: &Customer) -> StorageResult<()> {
        let bytes = serde_json::to_vec(customer)?;
        let mut table = txn.open_table(CUSTOMERS_TABLE)?;
        table.insert(customer.email.as_str(), bytes.as_slice())?;
        Ok(())
    }

    pub fn load_customer(
        &self,
        txn: &WriteTransaction,
        email: &str,
    ) -> StorageResult<Option<Customer>> {
        let table = txn.open_table(CUSTOMERS_TABLE)?;
        match table.get(email)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_customer(&self, email: &str) -> StorageResult<Option<Customer>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CUSTOMERS_TABLE)?;
        match table.get(email)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Quotations ==========

    pub fn store_quotation(
        &self,
        txn: &WriteTransaction,
        quotation: &Quotation,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(quotation)?;
        let mut table = txn.open_table(QUOTATIONS_TABLE)?;
        table.insert(quotation.booking_id, bytes.as_slice())?;
        Ok(())
    }

    pub fn load_quotation(
        &self,
        txn: &WriteTransaction,
        booking_id: u64,
    ) -> StorageResult<Option<Quotation>> {
        let table = txn.open_table(QUOTATIONS_TABLE)?;
        match table.get(booking_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_quotation(&self, booking_id: u64) -> StorageResult<Option<Quotation>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(QUOTATIONS_TABLE)?;
        match table.get(booking_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Payments ==========

    pub fn store_payment(
        &self,
        txn: &WriteTransaction,
        payment: &PaymentRecord,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(payment)?;
        let mut table = txn.open_table(PAYMENTS_TABLE)?;
        table.insert(payment.booking_id, bytes.as_slice())?;
        Ok(())
    }

    pub fn load_payment(
        &self,
        txn: &WriteTransaction,
        booking_id: u64,
    ) -> StorageResult<Option<PaymentRecord>> {
        let table = txn.open_table(PAYMENTS_TABLE)?;
        match table.get(booking_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_payment(&self, booking_id: u64) -> StorageResult<Option<PaymentRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PAYMENTS_TABLE)?;
        match table.get(booking_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Discount codes ==========

    /// Upsert a discount code. The booking core only reads codes; this is
    /// the seam external admin tooling writes through.
    pub fn store_discount_code(&self, code: &DiscountCode) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let bytes = serde_json::to_vec(code)?;
            let mut table = txn.open_table(DISCOUNT_CODES_TABLE)?;
            table.insert(code.code.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_discount_code(&self, code: &str) -> StorageResult<Option<DiscountCode>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DISCOUNT_CODES_TABLE)?;
        match table.get(code)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Webhook idempotency ==========

    /// Record a provider event id. Returns `false` if the event was already
    /// processed (exact-duplicate redelivery).
    pub fn mark_event_processed(
        &self,
        txn: &WriteTransaction,
        event_id: &str,
    ) -> StorageResult<bool> {
        let mut table = txn.open_table(PROCESSED_EVENTS_TABLE)?;
        if table.get(event_id)?.is_some() {
            return Ok(false);
        }
        table.insert(event_id, ())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared::models::{Address, BookingItem, ItemSize};

    fn test_booking(id: u64) -> Booking {
        let now = Utc::now();
        let pickup = now + Duration::hours(48);
        Booking {
            id,
            status: BookingStatus::Received,
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
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn booking_round_trip() {
        let store = BookingStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let id = store.next_booking_id(&txn).unwrap();
        assert_eq!(id, 1);
        store.store_booking(&txn, &test_booking(id)).unwrap();
        txn.commit().unwrap();

        let loaded = store.get_booking(1).unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Received);
        assert_eq!(loaded.customer_email, "a@example.com");
        assert!(store.get_booking(2).unwrap().is_none());
    }

    #[test]
    fn booking_ids_are_sequential() {
        let store = BookingStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        assert_eq!(store.next_booking_id(&txn).unwrap(), 1);
        assert_eq!(store.next_booking_id(&txn).unwrap(), 2);
        txn.commit().unwrap();

        let txn = store.begin_write().unwrap();
        assert_eq!(store.next_booking_id(&txn).unwrap(), 3);
        txn.commit().unwrap();
    }

    #[test]
    fn transition_status_rejects_unexpected_precondition() {
        let store = BookingStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        store.store_booking(&txn, &test_booking(1)).unwrap();
        txn.commit().unwrap();

        let txn = store.begin_write().unwrap();
        let result = store.transition_status(
            &txn,
            1,
            &[BookingStatus::Confirmed],
            BookingStatus::Invoiced,
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(StorageError::StatusConflict {
                current: BookingStatus::Received,
                ..
            })
        ));
    }

    #[test]
    fn transition_status_applies_when_precondition_holds() {
        let store = BookingStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        store.store_booking(&txn, &test_booking(1)).unwrap();
        store
            .transition_status(
                &txn,
                1,
                &[BookingStatus::Received, BookingStatus::Quoted],
                BookingStatus::Quoted,
                Utc::now(),
            )
            .unwrap();
        txn.commit().unwrap();

        let loaded = store.get_booking(1).unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Quoted);
    }

    #[test]
    fn processed_events_detect_redelivery() {
        let store = BookingStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        assert!(store.mark_event_processed(&txn, "evt_1").unwrap());
        assert!(!store.mark_event_processed(&txn, "evt_1").unwrap());
        assert!(store.mark_event_processed(&txn, "evt_2").unwrap());
        txn.commit().unwrap();

        let txn = store.begin_write().unwrap();
        assert!(!store.mark_event_processed(&txn, "evt_1").unwrap());
    }

    #[test]
    fn uncommitted_transaction_leaves_no_trace() {
        let store = BookingStore::open_in_memory().unwrap();
        {
            let txn = store.begin_write().unwrap();
            store.store_booking(&txn, &test_booking(7)).unwrap();
            // dropped without commit
        }
        assert!(store.get_booking(7).unwrap().is_none());
    }
}
