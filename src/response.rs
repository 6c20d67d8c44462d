//! JSON response shapes for the nearest query.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{QueryResult, ResultEntry};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NearestResponse {
    pub data: Vec<CarParkEntry>,
    pub pagination: Pagination,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CarParkEntry {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_lots: u32,
    pub available_lots: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub total_count: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ResultEntry> for CarParkEntry {
    fn from(entry: &ResultEntry) -> Self {
        Self {
            address: entry.address.clone(),
            latitude: entry.latitude,
            longitude: entry.longitude,
            total_lots: entry.total_capacity,
            available_lots: entry.available_capacity,
        }
    }
}

/// Builds the response body for a query result, stamped with `now`.
pub fn render_nearest(result: &QueryResult, now: DateTime<Utc>) -> NearestResponse {
    NearestResponse {
        data: result.entries.iter().map(CarParkEntry::from).collect(),
        pagination: Pagination {
            total_count: result.total_count,
            page: result.page,
            per_page: result.per_page,
            total_pages: result.total_pages,
        },
        timestamp: now,
    }
}

pub fn render_error(error: &dyn std::error::Error, now: DateTime<Utc>) -> ErrorResponse {
    ErrorResponse {
        error: error.to_string(),
        timestamp: now,
    }
}
