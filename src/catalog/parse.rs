//! Car park information CSV → `Location` rows.
//!
//! Each row either becomes a fully valid `Location` or is dropped; there is
//! no partially-typed intermediate that escapes this module.

use std::collections::{HashMap, HashSet};

use crate::geo::svy21_to_wgs84;
use crate::logging::{self, LogSource};
use crate::model::Location;

// ---------------------------------------------------------------------------
// Column names (bit-exact header fields of the export)
// ---------------------------------------------------------------------------

pub const COL_CAR_PARK_NO: &str = "car_park_no";
pub const COL_ADDRESS: &str = "address";
pub const COL_X_COORD: &str = "x_coord";
pub const COL_Y_COORD: &str = "y_coord";
pub const COL_CAR_PARK_TYPE: &str = "car_park_type";
pub const COL_PARKING_SYSTEM: &str = "type_of_parking_system";
pub const COL_SHORT_TERM: &str = "short_term_parking";
pub const COL_FREE_PARKING: &str = "free_parking";
pub const COL_NIGHT_PARKING: &str = "night_parking";
pub const COL_DECKS: &str = "car_park_decks";
pub const COL_GANTRY_HEIGHT: &str = "gantry_height";
pub const COL_BASEMENT: &str = "car_park_basement";

/// Columns without which no row can pass validation.
const REQUIRED_COLUMNS: &[&str] = &[COL_CAR_PARK_NO, COL_ADDRESS, COL_X_COORD, COL_Y_COORD];

/// Result of parsing one export.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCatalog {
    /// Valid locations in source order.
    pub locations: Vec<Location>,
    /// Data rows that were discarded.
    pub dropped: usize,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses the full text of a car park information export.
///
/// Never fails: the text has already been read. An empty input (no header at
/// all) yields an empty catalog. A header lacking a required column is
/// logged at warn level; every row then fails validation and is dropped.
pub fn parse_catalog(text: &str) -> ParsedCatalog {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text).into_iter();

    let header = match records.next() {
        Some(fields) => Header::new(fields),
        None => {
            return ParsedCatalog {
                locations: Vec::new(),
                dropped: 0,
            };
        }
    };

    let mut locations = Vec::new();
    let mut seen = HashSet::new();
    let mut dropped = 0;

    for fields in records {
        match header.parse_row(&fields) {
            Some(location) if seen.insert(location.key.clone()) => locations.push(location),
            Some(location) => {
                logging::debug(
                    LogSource::Catalog,
                    Some(location.key.as_str()),
                    "duplicate car park number, keeping first",
                );
                dropped += 1;
            }
            None => {
                let key = fields.first().map(String::as_str);
                logging::debug(LogSource::Catalog, key, "row failed validation, dropped");
                dropped += 1;
            }
        }
    }

    ParsedCatalog { locations, dropped }
}

/// Column positions resolved from the header row.
struct Header {
    positions: HashMap<String, usize>,
}

impl Header {
    fn new(fields: Vec<String>) -> Self {
        let positions: HashMap<String, usize> = fields
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        for column in REQUIRED_COLUMNS {
            if !positions.contains_key(*column) {
                logging::warn(
                    LogSource::Catalog,
                    None,
                    &format!("Header has no '{}' column; no row can be loaded", column),
                );
            }
        }

        Self { positions }
    }

    /// Trimmed value of `column` in `fields`; empty if the column is absent
    /// from the header or the row is short.
    fn field<'a>(&self, fields: &'a [String], column: &str) -> &'a str {
        self.positions
            .get(column)
            .and_then(|&i| fields.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    fn parse_row(&self, fields: &[String]) -> Option<Location> {
        let key = self.field(fields, COL_CAR_PARK_NO);
        let address = self.field(fields, COL_ADDRESS);
        if key.is_empty() || address.is_empty() {
            return None;
        }

        let x = parse_number(self.field(fields, COL_X_COORD))?;
        let y = parse_number(self.field(fields, COL_Y_COORD))?;
        let (latitude, longitude) = svy21_to_wgs84(x, y);

        let location = Location {
            key: key.to_string(),
            address: address.to_string(),
            latitude,
            longitude,
            car_park_type: self.field(fields, COL_CAR_PARK_TYPE).to_string(),
            parking_system_type: self.field(fields, COL_PARKING_SYSTEM).to_string(),
            short_term_parking: self.field(fields, COL_SHORT_TERM).to_string(),
            free_parking: self.field(fields, COL_FREE_PARKING).to_string(),
            night_parking: self.field(fields, COL_NIGHT_PARKING).to_string(),
            car_park_decks: self.field(fields, COL_DECKS).parse().unwrap_or(0),
            gantry_height: parse_number(self.field(fields, COL_GANTRY_HEIGHT)),
            car_park_basement: self.field(fields, COL_BASEMENT).to_string(),
        };

        location.has_valid_coordinates().then_some(location)
    }
}

/// Parses a finite float; anything else (empty, text, NaN, inf) is `None`.
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Splits CSV text into records of fields.
///
/// Handles double-quoted fields containing commas, doubled quotes and line
/// breaks, and both `\n` and `\r\n` line endings. Blank lines are skipped.
pub fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push(record);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
