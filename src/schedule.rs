//! Per-stop schedules built from `stop_times.txt`.
//!
//! A single pass over the stop-time rows joins each row with its trip and
//! route and appends the result to the list of its stop. Once every row is
//! in, each stop's list is sorted by arrival time. The time is compared as
//! the raw `HH:MM:SS` string: hours past 23 denote service after midnight,
//! so `25:30:00` must sort after `08:00:00`, which only the fixed-width
//! string order guarantees.

use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::FeedError;
use crate::feed::{Row, Table};
use crate::index::RouteTripIndex;

/// Route name emitted when a trip points at a route missing from `routes.txt`.
pub const UNKNOWN_ROUTE: &str = "???";

/// One scheduled arrival at a stop, as written to `stops/<stop_id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledArrival {
    pub time: String,
    pub route: String,
    pub headsign: String,
    pub service_id: String,
    pub trip_id: String,
}

/// The three columns of a stop-time row the aggregation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTimeEntry<'a> {
    pub stop_id: &'a str,
    pub trip_id: &'a str,
    pub arrival_time: &'a str,
}

impl<'a> StopTimeEntry<'a> {
    pub fn from_row(row: &Row<'a>) -> Result<Self, FeedError> {
        Ok(Self {
            stop_id: row.require("stop_id")?,
            trip_id: row.require("trip_id")?,
            arrival_time: row.require("arrival_time")?,
        })
    }
}

/// Result of the aggregation: arrivals grouped by stop plus pass counters.
#[derive(Debug, Default)]
pub struct StopSchedules {
    pub by_stop: HashMap<String, Vec<ScheduledArrival>>,
    /// Stop-time rows read.
    pub rows: usize,
    /// Rows dropped because their trip is not in `trips.txt`.
    pub discarded: usize,
    /// Arrivals emitted with [`UNKNOWN_ROUTE`].
    pub unresolved_routes: usize,
}

impl StopSchedules {
    pub fn arrival_count(&self) -> usize {
        self.by_stop.values().map(Vec::len).sum()
    }

    pub fn get(&self, stop_id: &str) -> Option<&[ScheduledArrival]> {
        self.by_stop.get(stop_id).map(Vec::as_slice)
    }

    /// Stops in ascending id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &[ScheduledArrival])> {
        let mut stops: Vec<_> = self.by_stop.iter().collect();
        stops.sort_unstable_by(|a, b| a.0.cmp(b.0));
        stops
            .into_iter()
            .map(|(stop_id, arrivals)| (stop_id.as_str(), arrivals.as_slice()))
    }
}

/// Accumulates stop-time entries; [`ScheduleBuilder::finish`] sorts them.
pub struct ScheduleBuilder<'i> {
    index: &'i RouteTripIndex,
    schedules: StopSchedules,
}

impl<'i> ScheduleBuilder<'i> {
    pub fn new(index: &'i RouteTripIndex) -> Self {
        Self {
            index,
            schedules: StopSchedules::default(),
        }
    }

    pub fn push(&mut self, entry: StopTimeEntry<'_>) {
        self.schedules.rows += 1;

        // Every stop seen in stop_times.txt gets a schedule, even an empty one.
        if !self.schedules.by_stop.contains_key(entry.stop_id) {
            self.schedules
                .by_stop
                .insert(entry.stop_id.to_string(), Vec::new());
        }

        let Some(trip) = self.index.trip(entry.trip_id) else {
            self.schedules.discarded += 1;
            return;
        };

        let route = match self.index.route_short_name(&trip.route_id) {
            Some(name) => name,
            None => {
                self.schedules.unresolved_routes += 1;
                UNKNOWN_ROUTE
            }
        };

        let arrival = ScheduledArrival {
            time: entry.arrival_time.to_string(),
            route: route.to_string(),
            headsign: trip.headsign.clone(),
            service_id: trip.service_id.clone(),
            trip_id: entry.trip_id.to_string(),
        };

        if let Some(arrivals) = self.schedules.by_stop.get_mut(entry.stop_id) {
            arrivals.push(arrival);
        }
    }

    /// Sorts every stop's arrivals. Stops are independent, so they are
    /// sorted in parallel.
    pub fn finish(mut self) -> StopSchedules {
        self.schedules
            .by_stop
            .par_iter_mut()
            .for_each(|(_, arrivals)| arrivals.sort_by(compare_arrivals));
        self.schedules
    }
}

/// Time string first, then trip id; remaining ties keep encounter order.
fn compare_arrivals(a: &ScheduledArrival, b: &ScheduledArrival) -> Ordering {
    a.time
        .cmp(&b.time)
        .then_with(|| a.trip_id.cmp(&b.trip_id))
}

/// Groups every row of `stop_times.txt` by stop and sorts each group.
#[tracing::instrument(skip_all, fields(rows = stop_times.len()))]
pub fn aggregate_stop_times(
    stop_times: &Table,
    index: &RouteTripIndex,
) -> Result<StopSchedules, FeedError> {
    let mut builder = ScheduleBuilder::new(index);
    for row in stop_times.rows() {
        builder.push(StopTimeEntry::from_row(&row)?);
    }
    let schedules = builder.finish();

    debug!(
        stops = schedules.by_stop.len(),
        discarded = schedules.discarded,
        unresolved_routes = schedules.unresolved_routes,
        "Stop times aggregated"
    );

    Ok(schedules)
}
