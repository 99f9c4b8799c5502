//! Stop directory written to `stops.json`.

use serde::Serialize;

use crate::error::FeedError;
use crate::feed::{Row, Table};

/// An entry of `stops.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopRecord {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub code: String,
}

impl StopRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, FeedError> {
        Ok(Self {
            id: row.require("stop_id")?.to_string(),
            name: row.require("stop_name")?.to_string(),
            lat: parse_coordinate(row, "stop_lat")?,
            lon: parse_coordinate(row, "stop_lon")?,
            code: row.get("stop_code").unwrap_or_default().to_string(),
        })
    }
}

fn parse_coordinate(row: &Row<'_>, column: &str) -> Result<f64, FeedError> {
    let value = row.require(column)?;
    match value.trim().parse::<f64>() {
        Ok(coordinate) if coordinate.is_finite() => Ok(coordinate),
        _ => Err(row.invalid(column, value)),
    }
}

/// Builds the stop directory in `stops.txt` order.
pub fn build_stop_directory(stops: &Table) -> Result<Vec<StopRecord>, FeedError> {
    stops.rows().map(|row| StopRecord::from_row(&row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> Table {
        Table::from_reader("stops.txt", text.as_bytes()).unwrap()
    }

    #[test]
    fn test_build_stop_directory() {
        let stops = table(
            "stop_id,stop_code,stop_name,stop_lat,stop_lon\n\
             A,100,Main St,52.52,13.405\n\
             B,,Harbor,-33.8688,151.2093\n",
        );

        let directory = build_stop_directory(&stops).unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(
            directory[0],
            StopRecord {
                id: "A".into(),
                name: "Main St".into(),
                lat: 52.52,
                lon: 13.405,
                code: "100".into(),
            }
        );
        assert_eq!(directory[1].code, "");
        assert_eq!(directory[1].lat, -33.8688);
    }

    #[test]
    fn test_code_defaults_to_empty_without_column() {
        let stops = table("stop_id,stop_name,stop_lat,stop_lon\nA,Main St,1.5,2.5\n");

        let directory = build_stop_directory(&stops).unwrap();
        assert_eq!(directory[0].code, "");

        let json = serde_json::to_string(&directory).unwrap();
        assert_eq!(
            json,
            r#"[{"id":"A","name":"Main St","lat":1.5,"lon":2.5,"code":""}]"#
        );
    }

    #[test]
    fn test_unparseable_latitude_is_invalid() {
        let stops = table("stop_id,stop_name,stop_lat,stop_lon\nA,Main St,north,2.5\n");

        let result = build_stop_directory(&stops);
        assert!(matches!(
            result,
            Err(FeedError::InvalidField { ref field, ref value, .. })
                if field == "stop_lat" && value == "north"
        ));
    }

    #[test]
    fn test_non_finite_coordinates_are_invalid() {
        for value in ["NaN", "inf", "-infinity"] {
            let stops = table(&format!(
                "stop_id,stop_name,stop_lat,stop_lon\nA,Main St,1.5,{value}\n"
            ));

            let result = build_stop_directory(&stops);
            assert!(
                matches!(result, Err(FeedError::InvalidField { ref field, .. }) if field == "stop_lon"),
                "{value} was accepted"
            );
        }
    }
}
