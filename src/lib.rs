//! Nearest available car park lookup.
//!
//! Merges a slowly-changing car park catalog (loaded from the HDB car park
//! information CSV export) with frequently-changing lot availability, and
//! answers "which car parks near this point have free lots?" as a stably
//! ordered, paginated list.
//!
//! Module map:
//! - `geo`: SVY21 → WGS84 conversion and haversine distance.
//! - `catalog`: the in-memory catalog snapshot with atomic reload.
//! - `availability`: latest-record-per-key lookup (PostgreSQL or in memory).
//! - `query`: the nearest-car-park query itself.
//! - `request` / `response`: parameter validation and JSON shapes.
//! - `ingest`: one pass of pulling the public availability feed into the database.
//! - `db`, `config`, `logging`, `model`: plumbing and shared types.

pub mod availability;
pub mod catalog;
pub mod config;
pub mod db;
pub mod geo;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod query;
pub mod request;
pub mod response;
