/// Location, AvailabilityRecord, QueryResult, LoadError
/// core data structures and error handling
///
/// Core data types for the car park availability service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic beyond trivial accessors, no I/O, and no external
/// dependencies apart from `chrono` timestamps.

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

/// Valid latitude range in degrees.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A single car park from the information export.
///
/// Built once at catalog load time and never mutated afterwards. Only
/// `key`, `address`, `latitude` and `longitude` are validated; the remaining
/// descriptive attributes are carried through exactly as they appear in the
/// source.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Car park number, e.g. "ACB". Unique within the catalog.
    pub key: String,
    pub address: String,
    /// WGS84 latitude, converted from the SVY21 `y_coord`.
    pub latitude: f64,
    /// WGS84 longitude, converted from the SVY21 `x_coord`.
    pub longitude: f64,
    pub car_park_type: String,
    pub parking_system_type: String,
    pub short_term_parking: String,
    pub free_parking: String,
    pub night_parking: String,
    /// Number of decks; 0 when the source value is not an integer.
    pub car_park_decks: i64,
    /// Gantry clearance in metres; `None` when the source value is not numeric.
    pub gantry_height: Option<f64>,
    pub car_park_basement: String,
}

impl Location {
    /// Returns `true` if the coordinates fall inside the WGS84 bounds.
    pub fn has_valid_coordinates(&self) -> bool {
        LATITUDE_RANGE.contains(&self.latitude) && LONGITUDE_RANGE.contains(&self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Availability types
// ---------------------------------------------------------------------------

/// A lot-count reading for one car park at one point in time.
///
/// Owned by the persistence layer; the query path only ever sees the most
/// recent record per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRecord {
    pub key: String,
    pub total_capacity: u32,
    /// Always `<= total_capacity`.
    pub available_capacity: u32,
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Query result types
// ---------------------------------------------------------------------------

/// One row of a nearest-car-park result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    pub key: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance from the query point, in kilometres.
    pub distance_km: f64,
    pub total_capacity: u32,
    pub available_capacity: u32,
}

/// A single page of nearest car parks plus pagination metadata.
///
/// Recomputed for every request and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub entries: Vec<ResultEntry>,
    /// Number of car parks with free lots across all pages.
    pub total_count: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when reading the car park information source.
///
/// None of these are fatal to the process: a failed initial load leaves an
/// empty catalog, and a failed reload keeps the previous snapshot.
#[derive(Debug)]
pub enum LoadError {
    /// The configured data directory does not exist.
    DirectoryMissing(String),
    /// The directory exists but holds no CSV file with the expected prefix.
    NoMatchingFile { dir: String, prefix: String },
    /// Any other read failure.
    Io(std::io::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::DirectoryMissing(dir) => write!(f, "Data directory not found: {}", dir),
            LoadError::NoMatchingFile { dir, prefix } => {
                write!(f, "No CSV file starting with '{}' in {}", prefix, dir)
            }
            LoadError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}
