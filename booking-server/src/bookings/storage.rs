//! redb-based storage layer for the booking engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `offerings` | `offering_id` | `OfferingRecord` | Sellable offerings |
//! | `instances` | `instance_id` | `InstanceRecord` | Capacity counters |
//! | `bookings` | `booking_id` | `BookingRecord` | Reservations |
//! | `modifications` | `(booking_id, sequence)` | `BookingModification` | Append-only audit trail |
//! | `waitlist` | `(instance_id, queue_seq)` | `WaitlistEntry` | FIFO queue per instance |
//! | `waitlist_index` | `entry_id` | `(instance_id, queue_seq)` | Entry lookup |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | `()` | `u64` | Global sequence |
//!
//! # Concurrency
//!
//! redb permits a single write transaction at a time, so every
//! check-then-write on `available_spots` is serialized: two concurrent
//! modifications of the same instance cannot both pass a stale
//! availability check. This is the row-level exclusivity the capacity
//! ledger requires.
//!
//! # Durability
//!
//! Commits are persistent as soon as `commit()` returns (copy-on-write
//! with atomic pointer swap), so waitlist claim windows survive process
//! restarts and the expiry sweep can catch up after a crash.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::booking::{
    BookingModification, BookingRecord, InstanceRecord, OfferingRecord, WaitlistEntry,
};
use shared::{RefundStatus, WaitlistStatus};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Offerings: key = offering_id, value = JSON-serialized OfferingRecord
const OFFERINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("offerings");

/// Instances: key = instance_id, value = JSON-serialized InstanceRecord
const INSTANCES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("instances");

/// Bookings: key = booking_id, value = JSON-serialized BookingRecord
const BOOKINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("bookings");

/// Audit trail: key = (booking_id, sequence), value = JSON-serialized BookingModification
const MODIFICATIONS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("modifications");

/// Waitlist queue: key = (instance_id, queue_seq), value = JSON-serialized WaitlistEntry
///
/// `queue_seq` is allocated from the global sequence at join time, so
/// range scans per instance walk entries in strict join order.
const WAITLIST_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("waitlist");

/// Waitlist entry lookup: key = entry_id, value = JSON-serialized (instance_id, queue_seq)
const WAITLIST_INDEX_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("waitlist_index");

/// Processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Sequence counter: key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

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
    BookingNotFound(String),

    #[error("Waitlist entry not found: {0}")]
    WaitlistEntryNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Booking storage backed by redb
#[derive(Clone)]
pub struct BookingStorage {
    db: Arc<Database>,
}

impl BookingStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(OFFERINGS_TABLE)?;
            let _ = write_txn.open_table(INSTANCES_TABLE)?;
            let _ = write_txn.open_table(BOOKINGS_TABLE)?;
            let _ = write_txn.open_table(MODIFICATIONS_TABLE)?;
            let _ = write_txn.open_table(WAITLIST_TABLE)?;
            let _ = write_txn.open_table(WAITLIST_INDEX_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    ///
    /// Blocks until any other write transaction finishes; all capacity
    /// mutations are serialized through here.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Increment and return the sequence number (within transaction)
    pub fn increment_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(SEQUENCE_KEY, next)?;
        Ok(next)
    }

    /// Set sequence number (within transaction)
    ///
    /// Called once per command after all events have been allocated.
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Offering Operations ==========

    /// Store an offering (own transaction; used by seeding/admin flows)
    pub fn put_offering(&self, offering: &OfferingRecord) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.store_offering(&txn, offering)?;
        txn.commit()?;
        Ok(())
    }

    /// Store an offering within a transaction
    pub fn store_offering(
        &self,
        txn: &WriteTransaction,
        offering: &OfferingRecord,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(OFFERINGS_TABLE)?;
        let value = serde_json::to_vec(offering)?;
        table.insert(offering.offering_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an offering by ID
    pub fn get_offering(&self, offering_id: &str) -> StorageResult<Option<OfferingRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OFFERINGS_TABLE)?;
        match table.get(offering_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get an offering by ID (within transaction)
    pub fn get_offering_txn(
        &self,
        txn: &WriteTransaction,
        offering_id: &str,
    ) -> StorageResult<Option<OfferingRecord>> {
        let table = txn.open_table(OFFERINGS_TABLE)?;
        match table.get(offering_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Instance Operations ==========

    /// Store an instance (own transaction; used by seeding/admin flows)
    pub fn put_instance(&self, instance: &InstanceRecord) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.store_instance(&txn, instance)?;
        txn.commit()?;
        Ok(())
    }

    /// Store an instance within a transaction
    pub fn store_instance(
        &self,
        txn: &WriteTransaction,
        instance: &InstanceRecord,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(INSTANCES_TABLE)?;
        let value = serde_json::to_vec(instance)?;
        table.insert(instance.instance_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an instance by ID
    pub fn get_instance(&self, instance_id: &str) -> StorageResult<Option<InstanceRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INSTANCES_TABLE)?;
        match table.get(instance_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get an instance by ID (within transaction)
    pub fn get_instance_txn(
        &self,
        txn: &WriteTransaction,
        instance_id: &str,
    ) -> StorageResult<Option<InstanceRecord>> {
        let table = txn.open_table(INSTANCES_TABLE)?;
        match table.get(instance_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Booking Operations ==========

    /// Store a booking (own transaction; used by seeding and the
    /// out-of-scope reservation flow)
    pub fn put_booking(&self, booking: &BookingRecord) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.store_booking(&txn, booking)?;
        txn.commit()?;
        Ok(())
    }

    /// Store a booking within a transaction
    pub fn store_booking(
        &self,
        txn: &WriteTransaction,
        booking: &BookingRecord,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(BOOKINGS_TABLE)?;
        let value = serde_json::to_vec(booking)?;
        table.insert(booking.booking_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a booking by ID
    pub fn get_booking(&self, booking_id: &str) -> StorageResult<Option<BookingRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKINGS_TABLE)?;
        match table.get(booking_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a booking by ID (within transaction)
    pub fn get_booking_txn(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<Option<BookingRecord>> {
        let table = txn.open_table(BOOKINGS_TABLE)?;
        match table.get(booking_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All bookings placed against an instance (invariant checks, host views)
    pub fn bookings_for_instance(&self, instance_id: &str) -> StorageResult<Vec<BookingRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKINGS_TABLE)?;

        let mut bookings = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let booking: BookingRecord = serde_json::from_slice(value.value())?;
            if booking.instance_id == instance_id {
                bookings.push(booking);
            }
        }
        Ok(bookings)
    }

    // ========== Audit Trail Operations ==========

    /// Append an audit row
    pub fn append_modification(
        &self,
        txn: &WriteTransaction,
        modification: &BookingModification,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(MODIFICATIONS_TABLE)?;
        let key = (modification.booking_id.as_str(), modification.sequence);
        let value = serde_json::to_vec(modification)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Update an existing audit row (refund settlement only)
    pub fn update_modification(
        &self,
        txn: &WriteTransaction,
        modification: &BookingModification,
    ) -> StorageResult<()> {
        // Same key as append; the row is replaced in place
        self.append_modification(txn, modification)
    }

    /// All audit rows for a booking, in sequence order
    pub fn modifications_for_booking(
        &self,
        booking_id: &str,
    ) -> StorageResult<Vec<BookingModification>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MODIFICATIONS_TABLE)?;

        let mut rows = Vec::new();
        let range_start = (booking_id, 0u64);
        let range_end = (booking_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let row: BookingModification = serde_json::from_slice(value.value())?;
            rows.push(row);
        }

        rows.sort_by_key(|r| r.sequence);
        Ok(rows)
    }

    /// Audit rows with an unsettled refund, skipping rows that exhausted
    /// their retry budget
    pub fn pending_refunds(&self, max_attempts: u32) -> StorageResult<Vec<BookingModification>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MODIFICATIONS_TABLE)?;

        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let row: BookingModification = serde_json::from_slice(value.value())?;
            if row.refund_status == Some(RefundStatus::Pending)
                && row.refund_amount.unwrap_or(0.0) > 0.0
                && row.refund_attempts < max_attempts
            {
                rows.push(row);
            }
        }

        rows.sort_by_key(|r| r.sequence);
        Ok(rows)
    }

    /// Fetch one audit row by (booking_id, sequence) within a transaction
    pub fn get_modification_txn(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
        sequence: u64,
    ) -> StorageResult<Option<BookingModification>> {
        let table = txn.open_table(MODIFICATIONS_TABLE)?;
        match table.get((booking_id, sequence))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Waitlist Operations ==========

    /// Insert a waitlist entry keyed for FIFO range scans
    ///
    /// `queue_seq` must be allocated from the global sequence so join
    /// order and key order agree.
    pub fn insert_waitlist_entry(
        &self,
        txn: &WriteTransaction,
        entry: &WaitlistEntry,
        queue_seq: u64,
    ) -> StorageResult<()> {
        {
            let mut table = txn.open_table(WAITLIST_TABLE)?;
            let key = (entry.instance_id.as_str(), queue_seq);
            let value = serde_json::to_vec(entry)?;
            table.insert(key, value.as_slice())?;
        }
        {
            let mut index = txn.open_table(WAITLIST_INDEX_TABLE)?;
            let pointer = serde_json::to_vec(&(entry.instance_id.as_str(), queue_seq))?;
            index.insert(entry.entry_id.as_str(), pointer.as_slice())?;
        }
        Ok(())
    }

    /// Resolve an entry's queue key from the index
    fn waitlist_key_txn(
        &self,
        txn: &WriteTransaction,
        entry_id: &str,
    ) -> StorageResult<Option<(String, u64)>> {
        let index = txn.open_table(WAITLIST_INDEX_TABLE)?;
        match index.get(entry_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a waitlist entry by ID (within transaction)
    pub fn get_waitlist_entry_txn(
        &self,
        txn: &WriteTransaction,
        entry_id: &str,
    ) -> StorageResult<Option<WaitlistEntry>> {
        let Some((instance_id, queue_seq)) = self.waitlist_key_txn(txn, entry_id)? else {
            return Ok(None);
        };
        let table = txn.open_table(WAITLIST_TABLE)?;
        match table.get((instance_id.as_str(), queue_seq))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a waitlist entry by ID (read-only)
    pub fn get_waitlist_entry(&self, entry_id: &str) -> StorageResult<Option<WaitlistEntry>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WAITLIST_INDEX_TABLE)?;
        let Some(guard) = index.get(entry_id)? else {
            return Ok(None);
        };
        let (instance_id, queue_seq): (String, u64) = serde_json::from_slice(guard.value())?;
        let table = read_txn.open_table(WAITLIST_TABLE)?;
        match table.get((instance_id.as_str(), queue_seq))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Rewrite an entry in place (status transitions keep the queue key)
    pub fn update_waitlist_entry(
        &self,
        txn: &WriteTransaction,
        entry: &WaitlistEntry,
    ) -> StorageResult<()> {
        let (instance_id, queue_seq) = self
            .waitlist_key_txn(txn, &entry.entry_id)?
            .ok_or_else(|| StorageError::WaitlistEntryNotFound(entry.entry_id.clone()))?;
        let mut table = txn.open_table(WAITLIST_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert((instance_id.as_str(), queue_seq), value.as_slice())?;
        Ok(())
    }

    /// Oldest ACTIVE entry for an instance (FIFO head), if any
    pub fn oldest_active_entry(
        &self,
        txn: &WriteTransaction,
        instance_id: &str,
    ) -> StorageResult<Option<WaitlistEntry>> {
        let table = txn.open_table(WAITLIST_TABLE)?;
        let range_start = (instance_id, 0u64);
        let range_end = (instance_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let entry: WaitlistEntry = serde_json::from_slice(value.value())?;
            if entry.status == WaitlistStatus::Active {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Whether an instance has an outstanding NOTIFIED entry
    pub fn has_notified_entry(
        &self,
        txn: &WriteTransaction,
        instance_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(WAITLIST_TABLE)?;
        let range_start = (instance_id, 0u64);
        let range_end = (instance_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let entry: WaitlistEntry = serde_json::from_slice(value.value())?;
            if entry.status == WaitlistStatus::Notified {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 1-based FIFO position among non-terminal entries of an instance
    pub fn waitlist_position(
        &self,
        txn: &WriteTransaction,
        instance_id: &str,
        entry_id: &str,
    ) -> StorageResult<u32> {
        let table = txn.open_table(WAITLIST_TABLE)?;
        let range_start = (instance_id, 0u64);
        let range_end = (instance_id, u64::MAX);
        let mut position = 0u32;
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let entry: WaitlistEntry = serde_json::from_slice(value.value())?;
            if !entry.status.is_terminal() {
                position += 1;
            }
            if entry.entry_id == entry_id {
                return Ok(position);
            }
        }
        Err(StorageError::WaitlistEntryNotFound(entry_id.to_string()))
    }

    /// Number of non-terminal entries queued on an instance
    pub fn queue_len(&self, txn: &WriteTransaction, instance_id: &str) -> StorageResult<u32> {
        let table = txn.open_table(WAITLIST_TABLE)?;
        let range_start = (instance_id, 0u64);
        let range_end = (instance_id, u64::MAX);
        let mut len = 0u32;
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let entry: WaitlistEntry = serde_json::from_slice(value.value())?;
            if !entry.status.is_terminal() {
                len += 1;
            }
        }
        Ok(len)
    }

    /// Non-terminal entries an owner holds on an instance
    pub fn owner_entries_for_instance(
        &self,
        txn: &WriteTransaction,
        instance_id: &str,
        owner_id: &str,
    ) -> StorageResult<Vec<WaitlistEntry>> {
        let table = txn.open_table(WAITLIST_TABLE)?;
        let range_start = (instance_id, 0u64);
        let range_end = (instance_id, u64::MAX);
        let mut entries = Vec::new();
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let entry: WaitlistEntry = serde_json::from_slice(value.value())?;
            if entry.owner_id == owner_id && !entry.status.is_terminal() {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// All NOTIFIED entries across instances (expiry sweep input)
    pub fn notified_entries(&self) -> StorageResult<Vec<WaitlistEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WAITLIST_TABLE)?;
        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let entry: WaitlistEntry = serde_json::from_slice(value.value())?;
            if entry.status == WaitlistStatus::Notified {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// All entries for an instance in FIFO order (tests, host views)
    pub fn waitlist_for_instance(&self, instance_id: &str) -> StorageResult<Vec<WaitlistEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WAITLIST_TABLE)?;
        let range_start = (instance_id, 0u64);
        let range_end = (instance_id, u64::MAX);
        let mut entries = Vec::new();
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let entry: WaitlistEntry = serde_json::from_slice(value.value())?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::booking::records::WaitlistEntry;
    use shared::util::now_millis;

    fn entry(entry_id: &str, instance_id: &str, status: WaitlistStatus) -> WaitlistEntry {
        WaitlistEntry {
            entry_id: entry_id.to_string(),
            offering_id: "off-1".to_string(),
            instance_id: instance_id.to_string(),
            owner_id: "guest-1".to_string(),
            party_size: 2,
            status,
            joined_at: now_millis(),
            notified_at: None,
        }
    }

    #[test]
    fn test_waitlist_fifo_order() {
        let storage = BookingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .insert_waitlist_entry(&txn, &entry("a", "inst-1", WaitlistStatus::Active), 1)
            .unwrap();
        storage
            .insert_waitlist_entry(&txn, &entry("b", "inst-1", WaitlistStatus::Active), 2)
            .unwrap();
        storage
            .insert_waitlist_entry(&txn, &entry("c", "inst-2", WaitlistStatus::Active), 3)
            .unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        let head = storage.oldest_active_entry(&txn, "inst-1").unwrap().unwrap();
        assert_eq!(head.entry_id, "a");
        assert_eq!(storage.waitlist_position(&txn, "inst-1", "b").unwrap(), 2);
        drop(txn);

        let entries = storage.waitlist_for_instance("inst-1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_id, "a");
    }

    #[test]
    fn test_waitlist_head_skips_terminal_entries() {
        let storage = BookingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .insert_waitlist_entry(&txn, &entry("a", "inst-1", WaitlistStatus::Expired), 1)
            .unwrap();
        storage
            .insert_waitlist_entry(&txn, &entry("b", "inst-1", WaitlistStatus::Active), 2)
            .unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        let head = storage.oldest_active_entry(&txn, "inst-1").unwrap().unwrap();
        assert_eq!(head.entry_id, "b");
    }

    #[test]
    fn test_update_waitlist_entry_keeps_queue_key() {
        let storage = BookingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .insert_waitlist_entry(&txn, &entry("a", "inst-1", WaitlistStatus::Active), 1)
            .unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        let mut e = storage.get_waitlist_entry_txn(&txn, "a").unwrap().unwrap();
        e.status = WaitlistStatus::Notified;
        e.notified_at = Some(now_millis());
        storage.update_waitlist_entry(&txn, &e).unwrap();
        txn.commit().unwrap();

        assert!(storage.get_waitlist_entry("a").unwrap().unwrap().notified_at.is_some());
        let txn = storage.begin_write().unwrap();
        assert!(storage.has_notified_entry(&txn, "inst-1").unwrap());
    }

    #[test]
    fn test_command_idempotency_marking() {
        let storage = BookingStorage::open_in_memory().unwrap();
        assert!(!storage.is_command_processed("cmd-1").unwrap());

        let txn = storage.begin_write().unwrap();
        storage.mark_command_processed(&txn, "cmd-1").unwrap();
        assert!(storage.is_command_processed_txn(&txn, "cmd-1").unwrap());
        txn.commit().unwrap();

        assert!(storage.is_command_processed("cmd-1").unwrap());
    }
}
