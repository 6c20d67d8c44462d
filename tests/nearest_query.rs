/// Integration tests for the nearest-car-park query
///
/// These tests drive the public API end to end with an inline catalog and
/// the in-memory availability store:
/// 1. Only car parks with free lots are returned
/// 2. Results are ordered by distance from the query point
/// 3. Pagination metadata and slicing are consistent
/// 4. Concurrent queries see a whole snapshot across a reload
///
/// No database or network access is needed.
///
/// Run with: cargo test --test nearest_query

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use carpark_service::availability::{AvailabilityLookup, InMemoryAvailability};
use carpark_service::catalog::{InlineSource, LocationCatalog};
use carpark_service::geo::{haversine_km, wgs84_to_svy21};
use carpark_service::model::{AvailabilityRecord, QueryResult};
use carpark_service::query::NearestQueryService;

use chrono::{DateTime, TimeZone, Utc};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const HEADER: &str = "car_park_no,address,x_coord,y_coord,car_park_type,type_of_parking_system,short_term_parking,free_parking,night_parking,car_park_decks,gantry_height,car_park_basement";

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).expect("non-zero")
}

fn observed() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Builds an export with one row per `(key, latitude, longitude)`.
fn export(car_parks: &[(&str, f64, f64)]) -> String {
    let mut text = String::from(HEADER);
    for (key, lat, lon) in car_parks {
        let (x, y) = wgs84_to_svy21(*lat, *lon);
        text.push_str(&format!(
            "\n{},BLK {} TEST STREET,{},{},SURFACE CAR PARK,ELECTRONIC PARKING,WHOLE DAY,NO,YES,0,4.50,N",
            key, key, x, y
        ));
    }
    text
}

fn record(key: &str, total: u32, available: u32) -> AvailabilityRecord {
    AvailabilityRecord {
        key: key.to_string(),
        total_capacity: total,
        available_capacity: available,
        observed_at: observed(),
    }
}

/// A small grid of car parks around central Singapore with mixed availability.
fn grid_fixture() -> (String, Vec<AvailabilityRecord>) {
    let mut car_parks = Vec::new();
    let mut records = Vec::new();
    for row in 0..6 {
        for col in 0..6 {
            let key = format!("G{}{}", row, col);
            let lat = 1.28 + row as f64 * 0.007;
            let lon = 103.82 + col as f64 * 0.009;
            // Every third car park is full.
            let available = if (row * 6 + col) % 3 == 0 { 0 } else { (row + col) as u32 + 1 };
            records.push(record(&key, 50, available));
            car_parks.push((key, lat, lon));
        }
    }
    let borrowed: Vec<(&str, f64, f64)> =
        car_parks.iter().map(|(k, lat, lon)| (k.as_str(), *lat, *lon)).collect();
    (export(&borrowed), records)
}

fn assert_sorted_by_distance(result: &QueryResult, lat: f64, lon: f64) {
    let distances: Vec<f64> = result
        .entries
        .iter()
        .map(|e| haversine_km(lat, lon, e.latitude, e.longitude))
        .collect();
    for pair in distances.windows(2) {
        assert!(pair[0] <= pair[1], "entries out of order: {:?}", distances);
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_full_car_park_at_query_point_is_skipped() {
    let catalog = LocationCatalog::new(InlineSource::new(export(&[
        ("L1", 1.3000, 103.8000),
        ("L2", 1.3100, 103.8100),
    ])));
    let store = InMemoryAvailability::with_records([record("L1", 100, 0), record("L2", 100, 5)]);
    let service = NearestQueryService::new(&catalog, &store);

    let result = service.find_nearest(1.3000, 103.8000, nz(1), nz(10));

    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].key, "L2");
    assert_eq!(result.entries[0].available_capacity, 5);
    assert_eq!(result.total_count, 1);
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.page, 1);
    assert_eq!(result.per_page, 10);
}

#[test]
fn test_twenty_five_available_car_parks_page_in_tens() {
    let car_parks: Vec<(String, f64, f64)> = (0..25)
        .map(|i| (format!("CP{:02}", i), 1.30 + i as f64 * 0.001, 103.80))
        .collect();
    let borrowed: Vec<(&str, f64, f64)> =
        car_parks.iter().map(|(k, lat, lon)| (k.as_str(), *lat, *lon)).collect();
    let catalog = LocationCatalog::new(InlineSource::new(export(&borrowed)));
    let store = InMemoryAvailability::with_records(car_parks.iter().map(|(k, _, _)| record(k, 10, 3)));
    let service = NearestQueryService::new(&catalog, &store);

    let page1 = service.find_nearest(1.30, 103.80, nz(1), nz(10));
    assert_eq!(page1.entries.len(), 10);
    assert_eq!(page1.total_count, 25);
    assert_eq!(page1.total_pages, 3);
    assert_eq!(page1.entries[0].key, "CP00");

    let page3 = service.find_nearest(1.30, 103.80, nz(3), nz(10));
    assert_eq!(page3.entries.len(), 5);
    assert_eq!(page3.entries[0].key, "CP20");
    assert_eq!(page3.entries[4].key, "CP24");

    let page4 = service.find_nearest(1.30, 103.80, nz(4), nz(10));
    assert!(page4.entries.is_empty());
    assert_eq!(page4.total_count, 25);
}

#[test]
fn test_no_availability_data_means_empty_result() {
    let (text, _) = grid_fixture();
    let catalog = LocationCatalog::new(InlineSource::new(text));
    let store = InMemoryAvailability::new();
    let service = NearestQueryService::new(&catalog, &store);

    let result = service.find_nearest(1.30, 103.84, nz(1), nz(10));
    assert!(result.entries.is_empty());
    assert_eq!(result.total_count, 0);
    assert_eq!(result.total_pages, 0);
}

// ---------------------------------------------------------------------------
// Properties across many query points and page sizes
// ---------------------------------------------------------------------------

#[test]
fn test_result_invariants_hold_for_many_queries() {
    let (text, records) = grid_fixture();
    let catalog = LocationCatalog::new(InlineSource::new(text));
    let store = InMemoryAvailability::with_records(records);
    let service = NearestQueryService::new(&catalog, &store);

    let query_points = [(1.28, 103.82), (1.30, 103.84), (1.315, 103.865), (1.35, 103.7), (1.0, 104.5)];

    for (lat, lon) in query_points {
        for per_page in [1, 3, 7, 10, 24, 50] {
            let first = service.find_nearest(lat, lon, nz(1), nz(per_page));
            let total_count = first.total_count;

            assert_eq!(first.total_pages, total_count.div_ceil(per_page));
            assert_eq!(first.total_pages == 0, total_count == 0);

            // Walk every page: together they must be the full sorted list.
            let mut seen = Vec::new();
            for page in 1..=first.total_pages.max(1) {
                let result = service.find_nearest(lat, lon, nz(page), nz(per_page));
                assert!(result.entries.len() <= per_page);
                assert!(result.entries.iter().all(|e| e.available_capacity > 0));
                assert_sorted_by_distance(&result, lat, lon);
                seen.extend(result.entries);
            }

            assert_eq!(seen.len(), total_count);
            let keys: HashSet<_> = seen.iter().map(|e| e.key.clone()).collect();
            assert_eq!(keys.len(), total_count, "no car park may appear on two pages");
            for pair in seen.windows(2) {
                assert!(pair[0].distance_km <= pair[1].distance_km);
            }
        }
    }
}

#[test]
fn test_identical_queries_return_identical_pages() {
    let (text, records) = grid_fixture();
    let catalog = LocationCatalog::new(InlineSource::new(text));
    let store = InMemoryAvailability::with_records(records);
    let service = NearestQueryService::new(&catalog, &store);

    let a = service.find_nearest(1.2975, 103.8425, nz(2), nz(5));
    let b = service.find_nearest(1.2975, 103.8425, nz(2), nz(5));
    assert_eq!(a, b);
}

#[test]
fn test_latest_availability_record_is_used() {
    let catalog = LocationCatalog::new(InlineSource::new(export(&[("ACB", 1.301, 103.854)])));
    let store = InMemoryAvailability::with_records([
        AvailabilityRecord {
            key: "ACB".to_string(),
            total_capacity: 105,
            available_capacity: 30,
            observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
        },
        AvailabilityRecord {
            key: "ACB".to_string(),
            total_capacity: 105,
            available_capacity: 0,
            observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        },
    ]);
    let service = NearestQueryService::new(&catalog, &store);

    // The newer reading says the car park is full.
    let result = service.find_nearest(1.301, 103.854, nz(1), nz(10));
    assert!(result.entries.is_empty());
}

#[test]
fn test_query_makes_exactly_one_availability_lookup() {
    let (text, records) = grid_fixture();
    let catalog = LocationCatalog::new(InlineSource::new(text));
    let store = InMemoryAvailability::with_records(records);
    let service = NearestQueryService::new(&catalog, &store);

    service.find_nearest(1.30, 103.84, nz(1), nz(10));
    assert_eq!(store.scan_count(), 1);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn test_queries_during_reload_see_whole_snapshots() {
    // Snapshot A has 10 available car parks, snapshot B has 20. A query must
    // observe one or the other, never a mix.
    let a: Vec<(String, f64, f64)> = (0..10).map(|i| (format!("A{}", i), 1.30 + i as f64 * 0.001, 103.8)).collect();
    let b: Vec<(String, f64, f64)> = (0..20).map(|i| (format!("B{}", i), 1.30 + i as f64 * 0.001, 103.8)).collect();
    let export_a = export(&a.iter().map(|(k, lat, lon)| (k.as_str(), *lat, *lon)).collect::<Vec<_>>());
    let export_b = export(&b.iter().map(|(k, lat, lon)| (k.as_str(), *lat, *lon)).collect::<Vec<_>>());

    let source = Arc::new(InlineSource::new(export_a.clone()));
    let catalog = LocationCatalog::new(Arc::clone(&source));
    let store = InMemoryAvailability::with_records(
        a.iter().chain(b.iter()).map(|(k, _, _)| record(k, 10, 1)),
    );

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let service = NearestQueryService::new(&catalog, &store);
                for _ in 0..200 {
                    let result = service.find_nearest(1.30, 103.8, nz(1), nz(100));
                    let all_a = result.entries.iter().all(|e| e.key.starts_with('A'));
                    let all_b = result.entries.iter().all(|e| e.key.starts_with('B'));
                    assert!(all_a || all_b, "query saw a mixed snapshot");
                    assert!(result.total_count == 10 || result.total_count == 20);
                }
            });
        }

        scope.spawn(|| {
            for i in 0..100 {
                source.replace(if i % 2 == 0 { export_b.clone() } else { export_a.clone() });
                catalog.reload().expect("inline source always loads");
            }
        });
    });
}

#[test]
fn test_lookup_trait_object_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync + ?Sized>() {}
    assert_send_sync::<dyn AvailabilityLookup>();
    assert_send_sync::<LocationCatalog>();
}
