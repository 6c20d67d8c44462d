//! In-memory car park catalog.
//!
//! The catalog owns an immutable `CatalogSnapshot` built from the car park
//! information export. Readers grab an `Arc` to the current snapshot and use
//! it for the rest of their request; `reload` builds a whole new snapshot
//! off to the side and swaps the reference in one step, so a reader never
//! sees a half-built catalog and never waits on a reload.
//!
//! The catalog is constructed once at startup and handed to the query
//! service by reference. There is no global instance.

mod parse;
mod source;

pub use parse::{ParsedCatalog, parse_catalog, split_records};
pub use source::{DirectorySource, InlineSource, TabularSource};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::logging::{self, LogSource};
use crate::model::{LoadError, Location};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A point-in-time copy of every valid car park, in source order.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    locations: Vec<Location>,
    by_key: HashMap<String, usize>,
    loaded_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    /// The snapshot a catalog holds before anything was loaded successfully.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(locations: Vec<Location>, loaded_at: DateTime<Utc>) -> Self {
        let by_key = locations
            .iter()
            .enumerate()
            .map(|(i, loc)| (loc.key.clone(), i))
            .collect();
        Self {
            locations,
            by_key,
            loaded_at: Some(loaded_at),
        }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Exact-match lookup by car park number.
    pub fn get(&self, key: &str) -> Option<&Location> {
        self.by_key.get(key).map(|&i| &self.locations[i])
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// `None` until a load has succeeded.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

/// Size and age of the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    pub count: usize,
    pub loaded_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub struct LocationCatalog {
    source: Box<dyn TabularSource>,
    // Readers load the pointer without locking; snapshots are immutable.
    current: ArcSwap<CatalogSnapshot>,
}

impl LocationCatalog {
    /// Creates the catalog and performs the initial load.
    ///
    /// Never fails: if the source cannot be read the error is logged and
    /// the catalog starts out empty (count 0, no `loaded_at`). Call
    /// `reload` once the source is fixed.
    pub fn new(source: impl TabularSource + 'static) -> Self {
        let catalog = Self {
            source: Box::new(source),
            current: ArcSwap::from_pointee(CatalogSnapshot::empty()),
        };

        if let Err(e) = catalog.reload() {
            logging::error(
                LogSource::Catalog,
                None,
                &format!("Initial load failed, starting with an empty catalog: {}", e),
            );
        }

        catalog
    }

    /// Reads and parses the source into a fresh snapshot without installing it.
    pub fn load(&self) -> Result<CatalogSnapshot, LoadError> {
        let text = self.source.read_table()?;
        let parsed = parse_catalog(&text);
        logging::log_load_summary(parsed.locations.len(), parsed.dropped);
        Ok(CatalogSnapshot::new(parsed.locations, Utc::now()))
    }

    /// Loads a new snapshot and swaps it in, returning the new count.
    ///
    /// On failure the previous snapshot stays active and the error is
    /// returned. Readers that already captured the old snapshot keep using
    /// it until they drop their `Arc`.
    pub fn reload(&self) -> Result<usize, LoadError> {
        let snapshot = Arc::new(self.load()?);
        let count = snapshot.len();

        self.current.store(snapshot);

        logging::info(
            LogSource::Catalog,
            None,
            &format!("Catalog reloaded from {}: {} car parks", self.source.describe(), count),
        );
        Ok(count)
    }

    /// The current snapshot. Capture it once per request.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.load_full()
    }

    /// Every location in the current snapshot, in source order.
    pub fn get_all(&self) -> Vec<Location> {
        self.snapshot().locations().to_vec()
    }

    /// Looks up a car park by number. Unknown keys are `None`, not an error.
    pub fn get_by_key(&self, key: &str) -> Option<Location> {
        self.snapshot().get(key).cloned()
    }

    pub fn stats(&self) -> CatalogStats {
        let snapshot = self.snapshot();
        CatalogStats {
            count: snapshot.len(),
            loaded_at: snapshot.loaded_at(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
