//! Latest-availability lookup.
//!
//! The query path asks for the newest record of every catalog key in a single
//! call. Two stores answer that question: PostgreSQL (one grouped query) and
//! an in-process store (one map reduction). Both pick, per key, the record
//! with the greatest `observed_at`.
//!
//! Lookups fail open: if the store is unreachable the answer is an empty
//! mapping, so every car park reads as "no known availability" rather than
//! the whole query failing.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};

use postgres::Client;

use crate::db;
use crate::logging;
use crate::model::AvailabilityRecord;

/// Batched "latest record per key" lookup.
pub trait AvailabilityLookup: Send + Sync {
    /// Returns the most recent record for each key that has one.
    ///
    /// An empty key set returns an empty map without touching the store.
    /// Keys with no records are absent from the result. Never errors.
    fn bulk_latest(&self, keys: &HashSet<String>) -> HashMap<String, AvailabilityRecord>;
}

/// Keeps, for every key, the record with the greatest `observed_at`. When two
/// records share a timestamp the one seen first is kept.
pub fn latest_per_key<I>(records: I) -> HashMap<String, AvailabilityRecord>
where
    I: IntoIterator<Item = AvailabilityRecord>,
{
    let mut latest: HashMap<String, AvailabilityRecord> = HashMap::new();
    for record in records {
        match latest.get(&record.key) {
            Some(current) if current.observed_at >= record.observed_at => {}
            _ => {
                latest.insert(record.key.clone(), record);
            }
        }
    }
    latest
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Availability records held in process.
///
/// Stores every record it is given, like the database does, and reduces to
/// the latest per key at lookup time.
#[derive(Debug, Default)]
pub struct InMemoryAvailability {
    records: Mutex<Vec<AvailabilityRecord>>,
    scans: AtomicUsize,
}

impl InMemoryAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = AvailabilityRecord>) -> Self {
        let store = Self::new();
        store.insert_all(records);
        store
    }

    pub fn insert(&self, record: AvailabilityRecord) {
        self.insert_all(std::iter::once(record));
    }

    pub fn insert_all(&self, records: impl IntoIterator<Item = AvailabilityRecord>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records);
    }

    /// How many times the stored records have been scanned by a lookup.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }
}

impl AvailabilityLookup for InMemoryAvailability {
    fn bulk_latest(&self, keys: &HashSet<String>) -> HashMap<String, AvailabilityRecord> {
        if keys.is_empty() {
            return HashMap::new();
        }

        self.scans.fetch_add(1, Ordering::Relaxed);
        let stored = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        latest_per_key(
            stored
                .iter()
                .filter(|r| keys.contains(&r.key))
                .cloned(),
        )
    }
}

// ---------------------------------------------------------------------------
// PostgreSQL store
// ---------------------------------------------------------------------------

/// Availability lookup backed by the `carpark.availability` table.
///
/// `postgres::Client` needs `&mut` for every query, so the single connection
/// sits behind a mutex; lookups from concurrent requests take turns.
pub struct PostgresAvailability {
    client: Mutex<Client>,
}

impl PostgresAvailability {
    pub fn new(client: Client) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }
}

impl AvailabilityLookup for PostgresAvailability {
    fn bulk_latest(&self, keys: &HashSet<String>) -> HashMap<String, AvailabilityRecord> {
        if keys.is_empty() {
            return HashMap::new();
        }

        let mut client = self.client.lock().unwrap_or_else(PoisonError::into_inner);

        let keys: Vec<String> = keys.iter().cloned().collect();
        match db::query_latest(&mut client, &keys) {
            Ok(records) => latest_per_key(records),
            Err(e) => {
                logging::log_lookup_failure("bulk latest availability query", &e);
                HashMap::new()
            }
        }
    }
}
