/// Car park availability feed client
///
/// Retrieves current lot counts for every HDB car park from the public
/// data.gov.sg transport API and turns them into `AvailabilityRecord`s for
/// storage.
///
/// API: https://api.data.gov.sg/v1/transport/carpark-availability

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use postgres::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::db;
use crate::logging::{self, LogSource};
use crate::model::AvailabilityRecord;

/// Lot type code for ordinary cars. Motorcycle ("Y") and heavy vehicle ("H")
/// lots are reported separately and ignored when a car entry exists.
pub const LOT_TYPE_CAR: &str = "C";

/// `update_datetime` in the feed is Singapore local time without an offset.
const FEED_UTC_OFFSET_SECS: i32 = 8 * 3600;

// ============================================================================
// Feed Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
pub struct FeedItem {
    #[serde(default)]
    pub carpark_data: Vec<FeedCarPark>,
}

#[derive(Debug, Deserialize)]
pub struct FeedCarPark {
    pub carpark_number: String,
    pub update_datetime: String,
    #[serde(default)]
    pub carpark_info: Vec<FeedLotInfo>,
}

/// Lot counts arrive as strings ("105") but are accepted as numbers too.
#[derive(Debug, Deserialize)]
pub struct FeedLotInfo {
    pub total_lots: Value,
    #[serde(default)]
    pub lot_type: String,
    pub lots_available: Value,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum IngestError {
    /// Non-2xx HTTP response from the feed.
    HttpStatus(u16),
    /// Connection, timeout or body read failure.
    Transport(reqwest::Error),
    /// The body was not the expected JSON.
    Parse(String),
    Database(postgres::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::HttpStatus(code) => write!(f, "HTTP error: {}", code),
            IngestError::Transport(e) => write!(f, "Request failed: {}", e),
            IngestError::Parse(msg) => write!(f, "Parse error: {}", msg),
            IngestError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        IngestError::Transport(e)
    }
}

impl From<postgres::Error> for IngestError {
    fn from(e: postgres::Error) -> Self {
        IngestError::Database(e)
    }
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Builds a blocking HTTP client with the given request timeout.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, IngestError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Fetches and parses the current feed.
pub fn fetch_latest(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<AvailabilityRecord>, IngestError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;

    if !response.status().is_success() {
        return Err(IngestError::HttpStatus(response.status().as_u16()));
    }

    let body = response.text()?;
    parse_feed(&body)
}

/// One ingest pass: fetch the feed, store what is new. Returns
/// `(records fetched, rows inserted)`.
pub fn run_once(
    http: &reqwest::blocking::Client,
    db_client: &mut Client,
    url: &str,
    now: DateTime<Utc>,
) -> Result<(usize, u64), IngestError> {
    let records = fetch_latest(http, url)?;
    let stored = db::insert_availability(db_client, &records, now)?;
    logging::log_ingest_summary(records.len(), stored);
    Ok((records.len(), stored))
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a feed body into records.
///
/// Car parks with unreadable counts or timestamps are skipped (and logged at
/// debug level) rather than failing the whole batch.
pub fn parse_feed(body: &str) -> Result<Vec<AvailabilityRecord>, IngestError> {
    let response: FeedResponse =
        serde_json::from_str(body).map_err(|e| IngestError::Parse(e.to_string()))?;

    let mut records = Vec::new();
    for item in response.items {
        for car_park in item.carpark_data {
            match parse_car_park(&car_park) {
                Some(record) => records.push(record),
                None => logging::debug(
                    LogSource::Ingest,
                    Some(car_park.carpark_number.as_str()),
                    "unusable feed entry skipped",
                ),
            }
        }
    }

    Ok(records)
}

fn parse_car_park(car_park: &FeedCarPark) -> Option<AvailabilityRecord> {
    let key = car_park.carpark_number.trim();
    if key.is_empty() {
        return None;
    }

    let lots = car_park
        .carpark_info
        .iter()
        .find(|info| info.lot_type == LOT_TYPE_CAR)
        .or_else(|| car_park.carpark_info.first())?;

    let total_capacity = parse_count(&lots.total_lots)?;
    let available_capacity = parse_count(&lots.lots_available)?.min(total_capacity);
    let observed_at = parse_update_datetime(&car_park.update_datetime)?;

    Some(AvailabilityRecord {
        key: key.to_string(),
        total_capacity,
        available_capacity,
        observed_at,
    })
}

/// Accepts `"105"`, `105`, and tolerates surrounding whitespace. Negative
/// values are unusable.
fn parse_count(value: &Value) -> Option<u32> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    }
}

/// Parses a feed timestamp into UTC.
///
/// The feed normally sends Singapore local time without an offset
/// (`2024-05-01T20:59:27`); values carrying an explicit offset are honoured.
pub fn parse_update_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(s) {
        return Some(with_offset.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()?;
    let singapore = FixedOffset::east_opt(FEED_UTC_OFFSET_SECS)?;
    singapore
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

// ============================================================================
// Tests
// ============================================================================
