use crate::error::{IngestError, Result};
use crate::models::StationMetadata;
use crate::utils::constants::MISSING_ELEVATION;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use validator::Validate;

pub struct StationReader {
    validate: bool,
}

impl StationReader {
    pub fn new() -> Self {
        Self { validate: true }
    }

    pub fn with_validation(validate: bool) -> Self {
        Self { validate }
    }

    /// Read station metadata from a `ghcnd-stations.txt` file
    pub fn read_stations(&self, path: &Path) -> Result<Vec<StationMetadata>> {
        if !path.exists() {
            return Err(IngestError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        self.read_stations_from(File::open(path)?)
    }

    pub fn read_stations_from<R: Read>(&self, source: R) -> Result<Vec<StationMetadata>> {
        let reader = BufReader::new(source);
        let mut stations = Vec::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line_number = index as u64 + 1;

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            let station = self.parse_station_line(&line, line_number)?;
            if self.validate {
                station.validate().map_err(|e| IngestError::Parse {
                    line: line_number,
                    column: "*".to_string(),
                    message: e.to_string(),
                })?;
            }
            stations.push(station);
        }

        Ok(stations)
    }

    /// Parse a single line from the stations file
    fn parse_station_line(&self, line: &str, line_number: u64) -> Result<StationMetadata> {
        // Expected format: ID LATITUDE LONGITUDE ELEVATION STATE NAME GSN HCN/CRN WMO
        // Only the first four whitespace-separated fields are used.
        let parts: Vec<&str> = line.split_whitespace().take(4).collect();
        if parts.len() < 4 {
            return Err(IngestError::Parse {
                line: line_number,
                column: "*".to_string(),
                message: format!("expected at least 4 fields, found {}", parts.len()),
            });
        }

        let number = |column: &str, raw: &str| -> Result<f64> {
            raw.parse::<f64>().map_err(|_| IngestError::Parse {
                line: line_number,
                column: column.to_string(),
                message: format!("invalid number '{}'", raw),
            })
        };

        let latitude = number("latitude", parts[1])?;
        let longitude = number("longitude", parts[2])?;
        let elevation = number("elevation", parts[3])?;

        // -999.9 marks a missing elevation
        let elevation = if (elevation - MISSING_ELEVATION).abs() < f64::EPSILON {
            None
        } else {
            Some(elevation)
        };

        Ok(StationMetadata::new(
            parts[0].to_string(),
            latitude,
            longitude,
            elevation,
        ))
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of stations without an elevation.
pub fn count_missing_elevation(stations: &[StationMetadata]) -> usize {
    stations.iter().filter(|s| s.elevation.is_none()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const STATIONS: &str = "\
ACW00011604  17.1167  -61.7833   10.1    ST JOHNS COOLIDGE FLD
AE000041196  25.3330   55.5170   34.0    SHARJAH INTER. AIRP            GSN     41196

AQC00914000 -14.3167 -170.7667 -999.9 AS AASUFOU
";

    #[test]
    fn test_parse_station_line() {
        let reader = StationReader::new();

        let line = "USW00094728  40.7789  -73.9692   39.6 NY NEW YORK CNTRL PK TWR       HCN 72506";
        let station = reader.parse_station_line(line, 1).unwrap();

        assert_eq!(station.station_id, "USW00094728");
        assert!((station.latitude - 40.7789).abs() < 0.00001);
        assert!((station.longitude - -73.9692).abs() < 0.00001);
        assert_eq!(station.elevation, Some(39.6));
    }

    #[test]
    fn test_read_stations_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        write!(temp_file, "{}", STATIONS)?;

        let reader = StationReader::new();
        let stations = reader.read_stations(temp_file.path())?;

        assert_eq!(stations.len(), 3);
        assert_eq!(stations[0].station_id, "ACW00011604");
        assert_eq!(stations[2].station_id, "AQC00914000");
        assert_eq!(stations[2].elevation, None);
        assert_eq!(count_missing_elevation(&stations), 1);

        Ok(())
    }

    #[test]
    fn test_malformed_line_is_error() {
        let reader = StationReader::new();
        let err = reader
            .read_stations_from("ACW00011604  17.1167\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, IngestError::Parse { line: 1, .. }));

        let err = reader
            .read_stations_from("ACW00011604  north  -61.7833   10.1\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, IngestError::Parse { ref column, .. } if column == "latitude"));
    }

    #[test]
    fn test_out_of_range_coordinate_fails_validation() {
        let data = "ACW00011604  97.1167  -61.7833   10.1\n";

        assert!(StationReader::new().read_stations_from(data.as_bytes()).is_err());
        assert_eq!(
            StationReader::with_validation(false)
                .read_stations_from(data.as_bytes())
                .unwrap()
                .len(),
            1
        );
    }
}
