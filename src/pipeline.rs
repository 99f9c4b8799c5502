//! End-to-end run: load the feed, build every artifact, write it out.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::calendar::build_service_calendar;
use crate::feed::Feed;
use crate::index::RouteTripIndex;
use crate::output::OutputLayout;
use crate::schedule::aggregate_stop_times;
use crate::stops::build_stop_directory;

/// Where to read the feed from and where to write the artifacts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub gtfs_dir: PathBuf,
    pub data_dir: PathBuf,
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stops: usize,
    pub routes: usize,
    pub trips: usize,
    pub services: usize,
    pub stop_time_rows: usize,
    pub stops_with_schedules: usize,
    pub arrivals: usize,
    pub discarded_rows: usize,
    pub unresolved_routes: usize,
}

/// Rebuilds every artifact under `config.data_dir` from the feed in
/// `config.gtfs_dir`.
#[tracing::instrument(skip_all, fields(gtfs_dir = %config.gtfs_dir.display(), data_dir = %config.data_dir.display()))]
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    info!("Starting GTFS processing");

    let layout = OutputLayout::create(&config.data_dir)?;

    let feed = Feed::load(&config.gtfs_dir)
        .with_context(|| format!("Failed to load feed from {}", config.gtfs_dir.display()))?;

    let services = build_service_calendar(&feed.calendar, &feed.calendar_dates)?;
    layout.write_services(&services)?;

    let stops = build_stop_directory(&feed.stops)?;
    layout.write_stop_directory(&stops)?;

    let index = RouteTripIndex::build(&feed.routes, &feed.trips)?;

    info!("Grouping stop times by stop");
    let schedules = aggregate_stop_times(&feed.stop_times, &index)?;
    let stops_with_schedules = layout.write_stop_schedules(&schedules)?;

    let summary = RunSummary {
        stops: stops.len(),
        routes: index.route_count(),
        trips: index.trip_count(),
        services: services.len(),
        stop_time_rows: schedules.rows,
        stops_with_schedules,
        arrivals: schedules.arrival_count(),
        discarded_rows: schedules.discarded,
        unresolved_routes: schedules.unresolved_routes,
    };

    info!(
        stops = summary.stops,
        routes = summary.routes,
        trips = summary.trips,
        services = summary.services,
        stop_time_rows = summary.stop_time_rows,
        stops_with_schedules = summary.stops_with_schedules,
        arrivals = summary.arrivals,
        discarded_rows = summary.discarded_rows,
        unresolved_routes = summary.unresolved_routes,
        "Done"
    );

    Ok(summary)
}
