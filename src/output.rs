//! Persistence of the generated JSON artifacts.
//!
//! Layout under the data directory:
//! - `services.json`: service calendar map
//! - `stops.json`: stop directory
//! - `stops/<stop_id>.json`: one schedule per stop

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::calendar::ServiceRule;
use crate::schedule::StopSchedules;
use crate::stops::StopRecord;

const PROGRESS_EVERY: usize = 1000;

/// Output directories, created up front so a bad path fails the run early.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    stops_dir: PathBuf,
}

impl OutputLayout {
    pub fn create(data_dir: &Path) -> Result<Self> {
        let stops_dir = data_dir.join("stops");
        fs::create_dir_all(&stops_dir)
            .with_context(|| format!("Failed to create output directory {}", stops_dir.display()))?;
        debug!(dir = %data_dir.display(), "Output directory ready");

        Ok(Self {
            root: data_dir.to_path_buf(),
            stops_dir,
        })
    }

    pub fn services_path(&self) -> PathBuf {
        self.root.join("services.json")
    }

    pub fn stop_directory_path(&self) -> PathBuf {
        self.root.join("stops.json")
    }

    pub fn stop_schedule_path(&self, stop_id: &str) -> PathBuf {
        self.stops_dir.join(format!("{}.json", file_stem(stop_id)))
    }

    pub fn write_services(&self, services: &BTreeMap<String, ServiceRule>) -> Result<()> {
        let path = self.services_path();
        write_json(&path, services)?;
        info!(path = %path.display(), services = services.len(), "Wrote service calendar");
        Ok(())
    }

    pub fn write_stop_directory(&self, stops: &[StopRecord]) -> Result<()> {
        let path = self.stop_directory_path();
        write_json(&path, stops)?;
        info!(path = %path.display(), stops = stops.len(), "Wrote stop directory");
        Ok(())
    }

    /// Writes one file per stop, in stop id order. Returns the file count.
    pub fn write_stop_schedules(&self, schedules: &StopSchedules) -> Result<usize> {
        let mut count = 0;
        for (stop_id, arrivals) in schedules.iter_sorted() {
            write_json(&self.stop_schedule_path(stop_id), arrivals)?;
            count += 1;
            if count % PROGRESS_EVERY == 0 {
                info!(count, "Wrote stop files");
            }
        }
        info!(count, dir = %self.stops_dir.display(), "Wrote stop schedules");
        Ok(count)
    }
}

/// Serializes `value` as compact JSON into `path`, replacing any existing file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Maps a stop id to a name that stays inside the stops directory.
///
/// `%`, `/` and `\` are percent-escaped, as are the dots of `.` and `..`,
/// so distinct ids always get distinct file names. The empty id becomes `%`,
/// which no escaped id can produce.
fn file_stem(stop_id: &str) -> String {
    let stem = match stop_id {
        "" => "%".to_string(),
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => {
            let mut stem = String::with_capacity(stop_id.len());
            for c in stop_id.chars() {
                match c {
                    '%' => stem.push_str("%25"),
                    '/' => stem.push_str("%2F"),
                    '\\' => stem.push_str("%5C"),
                    _ => stem.push(c),
                }
            }
            stem
        }
    };

    if stem != stop_id {
        warn!(stop_id, file = %stem, "Stop id is not a safe file name, escaped");
    }
    stem
}
