//! Lookup tables joining stop times to their trip and route.

use std::collections::HashMap;

use tracing::debug;

use crate::error::FeedError;
use crate::feed::Table;

/// The trip fields carried into every scheduled arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripInfo {
    pub route_id: String,
    pub service_id: String,
    pub headsign: String,
}

/// `route_id → short name` and `trip_id → TripInfo`.
///
/// Duplicate identifiers are tolerated: the later row replaces the earlier
/// one.
#[derive(Debug, Default)]
pub struct RouteTripIndex {
    routes: HashMap<String, String>,
    trips: HashMap<String, TripInfo>,
}

impl RouteTripIndex {
    pub fn build(routes: &Table, trips: &Table) -> Result<Self, FeedError> {
        let mut index = Self {
            routes: HashMap::with_capacity(routes.len()),
            trips: HashMap::with_capacity(trips.len()),
        };

        let mut duplicate_routes = 0usize;
        for row in routes.rows() {
            let route_id = row.require("route_id")?;
            let short_name = row.get("route_short_name").unwrap_or_default();
            if index
                .routes
                .insert(route_id.to_string(), short_name.to_string())
                .is_some()
            {
                duplicate_routes += 1;
            }
        }

        let mut duplicate_trips = 0usize;
        for row in trips.rows() {
            let trip_id = row.require("trip_id")?;
            let info = TripInfo {
                route_id: row.require("route_id")?.to_string(),
                service_id: row.require("service_id")?.to_string(),
                headsign: row.get("trip_headsign").unwrap_or_default().to_string(),
            };
            if index.trips.insert(trip_id.to_string(), info).is_some() {
                duplicate_trips += 1;
            }
        }

        debug!(
            routes = index.routes.len(),
            trips = index.trips.len(),
            duplicate_routes,
            duplicate_trips,
            "Route/trip index built"
        );

        Ok(index)
    }

    pub fn trip(&self, trip_id: &str) -> Option<&TripInfo> {
        self.trips.get(trip_id)
    }

    pub fn route_short_name(&self, route_id: &str) -> Option<&str> {
        self.routes.get(route_id).map(String::as_str)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }
}
