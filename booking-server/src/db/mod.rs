//! Persistence layer

mod storage;

pub use storage::{BookingStore, StorageError, StorageResult};
