//! Row-oriented access to the text tables of a static GTFS feed.
//!
//! Every table is read fully into memory as [`csv::StringRecord`]s plus a
//! column-name index, and rows are exposed as a mapping from column name to
//! string value through [`Row`].

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{info, warn};

use crate::error::FeedError;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// A parsed GTFS table: header columns plus all data records.
#[derive(Debug)]
pub struct Table {
    name: String,
    columns: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl Table {
    /// A table with no columns and no rows, used in place of an absent file.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Parses a comma-delimited stream whose first line is the header row.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, FeedError> {
        let csv_error = |source| FeedError::Csv {
            table: name.to_string(),
            source,
        };

        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

        let columns = rdr
            .headers()
            .map_err(csv_error)?
            .iter()
            .enumerate()
            .map(|(i, column)| (column.trim_start_matches(BYTE_ORDER_MARK).to_string(), i))
            .collect();

        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        Ok(Self {
            name: name.to_string(),
            columns,
            records,
        })
    }

    pub fn from_path(name: &str, path: &Path) -> Result<Self, FeedError> {
        let file = File::open(path).map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(name, file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().map(move |record| Row {
            table: self,
            record,
        })
    }
}

/// One data record of a [`Table`], addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Returns the cell for `column`, or `None` when the column does not
    /// exist or the row is too short to reach it.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = *self.table.columns.get(column)?;
        self.record.get(index)
    }

    /// Like [`Row::get`], but an absent cell is a malformed-row error.
    pub fn require(&self, column: &str) -> Result<&'a str, FeedError> {
        self.get(column).ok_or_else(|| FeedError::MissingField {
            table: self.table.name.clone(),
            line: self.line(),
            field: column.to_string(),
        })
    }

    /// Builds an [`FeedError::InvalidField`] pointing at this row.
    pub fn invalid(&self, column: &str, value: &str) -> FeedError {
        FeedError::InvalidField {
            table: self.table.name.clone(),
            line: self.line(),
            field: column.to_string(),
            value: value.to_string(),
        }
    }

    /// 1-based line number in the source file, header included.
    pub fn line(&self) -> u64 {
        self.record.position().map(|p| p.line()).unwrap_or(0)
    }
}

/// The six tables the pipeline consumes.
#[derive(Debug)]
pub struct Feed {
    pub stops: Table,
    pub routes: Table,
    pub trips: Table,
    pub calendar: Table,
    pub calendar_dates: Table,
    pub stop_times: Table,
}

impl Feed {
    /// Loads a feed from a directory of GTFS `.txt` files.
    ///
    /// `trips.txt` and `stop_times.txt` must exist; every other table falls
    /// back to an empty one with a warning.
    #[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self, FeedError> {
        let feed = Self {
            stops: load_optional(dir, "stops.txt")?,
            routes: load_optional(dir, "routes.txt")?,
            trips: load_required(dir, "trips.txt")?,
            calendar: load_optional(dir, "calendar.txt")?,
            calendar_dates: load_optional(dir, "calendar_dates.txt")?,
            stop_times: load_required(dir, "stop_times.txt")?,
        };

        info!(
            stops = feed.stops.len(),
            routes = feed.routes.len(),
            trips = feed.trips.len(),
            calendar = feed.calendar.len(),
            calendar_dates = feed.calendar_dates.len(),
            stop_times = feed.stop_times.len(),
            "Feed loaded"
        );

        Ok(feed)
    }
}

fn load_optional(dir: &Path, name: &str) -> Result<Table, FeedError> {
    let path = dir.join(name);
    if !path.exists() {
        warn!(table = name, path = %path.display(), "Table not found, using an empty table");
        return Ok(Table::empty(name));
    }
    Table::from_path(name, &path)
}

fn load_required(dir: &Path, name: &str) -> Result<Table, FeedError> {
    let path = dir.join(name);
    if !path.exists() {
        return Err(FeedError::MissingTable {
            table: name.to_string(),
            path,
        });
    }
    Table::from_path(name, &path)
}
