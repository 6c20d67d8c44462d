//! Nearest-car-park query.
//!
//! Per request: capture the catalog snapshot once, fetch availability for
//! every catalog key in one batched lookup, rank all car parks by distance,
//! keep those with free lots, and cut out the requested page.
//!
//! Ranking happens over the whole catalog before filtering and paging, so
//! page N is always the N-th slice of the globally nearest available car
//! parks. The sort is stable, so equal distances keep catalog order and
//! repeated identical queries page identically.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use crate::availability::AvailabilityLookup;
use crate::catalog::LocationCatalog;
use crate::geo::haversine_km;
use crate::logging::{self, LogSource};
use crate::model::{QueryResult, ResultEntry};

/// Stateless orchestrator over a catalog and an availability store. Cheap to
/// construct; concurrent callers may share one instance or make their own.
pub struct NearestQueryService<'a> {
    catalog: &'a LocationCatalog,
    availability: &'a dyn AvailabilityLookup,
}

impl<'a> NearestQueryService<'a> {
    pub fn new(catalog: &'a LocationCatalog, availability: &'a dyn AvailabilityLookup) -> Self {
        Self {
            catalog,
            availability,
        }
    }

    /// Returns one page of the nearest car parks that have free lots.
    ///
    /// `latitude`/`longitude` are assumed validated by the caller. A page past
    /// the end is empty, not an error.
    pub fn find_nearest(
        &self,
        latitude: f64,
        longitude: f64,
        page: NonZeroUsize,
        per_page: NonZeroUsize,
    ) -> QueryResult {
        let snapshot = self.catalog.snapshot();
        let locations = snapshot.locations();

        let keys: HashSet<String> = locations.iter().map(|loc| loc.key.clone()).collect();
        let availability = self.availability.bulk_latest(&keys);

        let mut ranked: Vec<_> = locations
            .iter()
            .map(|loc| {
                let distance = haversine_km(latitude, longitude, loc.latitude, loc.longitude);
                (distance, loc)
            })
            .collect();
        // `sort_by` is stable; ties keep catalog order.
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let available: Vec<ResultEntry> = ranked
            .into_iter()
            .map(|(distance_km, loc)| {
                let (total_capacity, available_capacity) = availability
                    .get(&loc.key)
                    .map(|r| (r.total_capacity, r.available_capacity))
                    .unwrap_or((0, 0));
                ResultEntry {
                    key: loc.key.clone(),
                    address: loc.address.clone(),
                    latitude: loc.latitude,
                    longitude: loc.longitude,
                    distance_km,
                    total_capacity,
                    available_capacity,
                }
            })
            .filter(|entry| entry.available_capacity > 0)
            .collect();

        let page = page.get();
        let per_page = per_page.get();
        let total_count = available.len();
        let total_pages = total_count.div_ceil(per_page);

        let offset = (page - 1).saturating_mul(per_page);
        let entries: Vec<ResultEntry> = available.into_iter().skip(offset).take(per_page).collect();

        logging::debug(
            LogSource::Query,
            None,
            &format!(
                "nearest ({:.5}, {:.5}): {} of {} car parks available, page {}/{} with {} entries",
                latitude,
                longitude,
                total_count,
                locations.len(),
                page,
                total_pages,
                entries.len()
            ),
        );

        QueryResult {
            entries,
            total_count,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::InMemoryAvailability;
    use crate::catalog::InlineSource;
    use crate::model::AvailabilityRecord;
    use chrono::{TimeZone, Utc};

    const HEADER: &str = "car_park_no,address,x_coord,y_coord,car_park_type,type_of_parking_system,short_term_parking,free_parking,night_parking,car_park_decks,gantry_height,car_park_basement";

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("non-zero")
    }

    /// Catalog rows for car parks placed `step` metres apart going north.
    fn column_of_car_parks(count: usize, step: f64) -> String {
        let mut text = String::from(HEADER);
        for i in 0..count {
            text.push_str(&format!(
                "\nCP{:02},ADDRESS {},30000,{},,,,,,,,",
                i,
                i,
                30000.0 + i as f64 * step
            ));
        }
        text
    }

    fn available(key: &str, lots: u32) -> AvailabilityRecord {
        AvailabilityRecord {
            key: key.to_string(),
            total_capacity: 100,
            available_capacity: lots,
            observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let catalog = LocationCatalog::new(InlineSource::new(column_of_car_parks(3, 100.0)));
        let store = InMemoryAvailability::with_records(["CP00", "CP01", "CP02"].map(|k| available(k, 1)));
        let service = NearestQueryService::new(&catalog, &store);

        let result = service.find_nearest(1.3, 103.8, nz(5), nz(10));
        assert!(result.entries.is_empty());
        assert_eq!(result.total_count, 3);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.page, 5);
    }

    #[test]
    fn test_missing_availability_counts_as_full() {
        let catalog = LocationCatalog::new(InlineSource::new(column_of_car_parks(3, 100.0)));
        let store = InMemoryAvailability::with_records([available("CP01", 4)]);
        let service = NearestQueryService::new(&catalog, &store);

        let result = service.find_nearest(1.3, 103.8, nz(1), nz(10));
        assert_eq!(result.total_count, 1);
        assert_eq!(result.entries[0].key, "CP01");
        assert_eq!(result.entries[0].total_capacity, 100);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        // Identical coordinates: every distance ties.
        let text = format!(
            "{}\nZZ,LAST ALPHABETICALLY,30000,30000,,,,,,,,\nAA,FIRST ALPHABETICALLY,30000,30000,,,,,,,,\nMM,MIDDLE,30000,30000,,,,,,,,",
            HEADER
        );
        let catalog = LocationCatalog::new(InlineSource::new(text));
        let store = InMemoryAvailability::with_records(["ZZ", "AA", "MM"].map(|k| available(k, 1)));
        let service = NearestQueryService::new(&catalog, &store);

        let result = service.find_nearest(1.3, 103.8, nz(1), nz(10));
        let keys: Vec<_> = result.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["ZZ", "AA", "MM"]);
    }

    #[test]
    fn test_empty_catalog_gives_empty_result_and_no_lookup() {
        let catalog = LocationCatalog::new(InlineSource::new(""));
        let store = InMemoryAvailability::new();
        let service = NearestQueryService::new(&catalog, &store);

        let result = service.find_nearest(1.3, 103.8, nz(1), nz(10));
        assert_eq!(result.total_count, 0);
        assert_eq!(result.total_pages, 0);
        assert!(result.entries.is_empty());
        assert_eq!(store.scan_count(), 0);
    }

    #[test]
    fn test_filtering_happens_after_global_ranking() {
        // Nearest two are full; page 1 with per_page 1 must be the third
        // nearest overall, page 2 the fourth.
        let catalog = LocationCatalog::new(InlineSource::new(column_of_car_parks(4, 1000.0)));
        let store = InMemoryAvailability::with_records([
            available("CP00", 0),
            available("CP01", 0),
            available("CP02", 5),
            available("CP03", 5),
        ]);
        let service = NearestQueryService::new(&catalog, &store);
        let (lat, lon) = crate::geo::svy21_to_wgs84(30000.0, 30000.0);

        let first = service.find_nearest(lat, lon, nz(1), nz(1));
        let second = service.find_nearest(lat, lon, nz(2), nz(1));
        assert_eq!(first.entries[0].key, "CP02");
        assert_eq!(second.entries[0].key, "CP03");
        assert_eq!(first.total_pages, 2);
    }
}
