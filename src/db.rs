/// PostgreSQL access for availability records
///
/// Schema lives in `sql/001_carpark_availability.sql`. Each ingest pass
/// appends one row per car park and observation time; nothing is ever
/// updated in place, so "current availability" always means "the row with
/// the latest update_datetime for that car park".

use chrono::{DateTime, Utc};
use postgres::{Client, NoTls, Row};

use crate::config;
use crate::model::AvailabilityRecord;

/// Schema holding all service tables.
pub const SCHEMA: &str = "carpark";

/// Latest record per car park, restricted to the requested keys, in a single
/// round trip.
const LATEST_FOR_KEYS_SQL: &str = "
    SELECT DISTINCT ON (car_park_no)
        car_park_no,
        total_lots,
        lots_available,
        update_datetime
    FROM carpark.availability
    WHERE car_park_no = ANY($1)
    ORDER BY car_park_no, update_datetime DESC
";

const INSERT_SQL: &str = "
    INSERT INTO carpark.availability
        (car_park_no, total_lots, lots_available, update_datetime, ingested_at)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (car_park_no, update_datetime) DO NOTHING
";

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Opens a plain (non-TLS) connection.
pub fn connect(database_url: &str) -> Result<Client, postgres::Error> {
    Client::connect(database_url, NoTls)
}

/// Connects using `DATABASE_URL` (from the environment or `.env`) and checks
/// that each named schema exists, so a missing migration shows up as a clear
/// message instead of a failed query later on.
pub fn connect_and_verify(schemas: &[&str]) -> Result<Client, String> {
    let url = config::database_url()
        .ok_or_else(|| "DATABASE_URL is not set (environment or .env)".to_string())?;

    let mut client = connect(&url).map_err(|e| format!("Failed to connect to database: {}", e))?;

    for schema in schemas {
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
                &[schema],
            )
            .map_err(|e| format!("Failed to inspect schemas: {}", e))?;
        let exists: bool = row.get(0);
        if !exists {
            return Err(format!(
                "Schema '{}' not found. Apply sql/001_carpark_availability.sql first.",
                schema
            ));
        }
    }

    Ok(client)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Fetches the most recent record for each key that has one. Keys with no
/// rows are simply missing from the output.
pub fn query_latest(
    client: &mut Client,
    keys: &[String],
) -> Result<Vec<AvailabilityRecord>, postgres::Error> {
    let rows = client.query(LATEST_FOR_KEYS_SQL, &[&keys])?;
    Ok(rows.iter().map(row_to_record).collect())
}

/// Stores records, skipping any (car park, time) pair already present.
/// Returns the number of rows actually inserted.
pub fn insert_availability(
    client: &mut Client,
    records: &[AvailabilityRecord],
    ingested_at: DateTime<Utc>,
) -> Result<u64, postgres::Error> {
    let mut tx = client.transaction()?;
    let statement = tx.prepare(INSERT_SQL)?;

    let mut inserted = 0;
    for record in records {
        let total = i32::try_from(record.total_capacity).unwrap_or(i32::MAX);
        let available = i32::try_from(record.available_capacity).unwrap_or(i32::MAX);
        inserted += tx.execute(
            &statement,
            &[&record.key, &total, &available, &record.observed_at, &ingested_at],
        )?;
    }

    tx.commit()?;
    Ok(inserted)
}

fn row_to_record(row: &Row) -> AvailabilityRecord {
    let total: i32 = row.get(1);
    let available: i32 = row.get(2);
    let total_capacity = u32::try_from(total).unwrap_or(0);

    AvailabilityRecord {
        key: row.get(0),
        total_capacity,
        available_capacity: u32::try_from(available).unwrap_or(0).min(total_capacity),
        observed_at: row.get(3),
    }
}
