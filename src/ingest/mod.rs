/// Availability ingestion.
///
/// Submodules:
/// - `carpark_api`: one fetch-parse-store pass against the public car park
///   availability feed. Scheduling repeated passes is left to the caller
///   (cron, systemd timer, etc.).

pub mod carpark_api;
