//! Durable result artifacts.
//!
//! Serializes aggregated standings to a structured JSON document and,
//! optionally, a flat CSV table. Filenames are timestamped at minute
//! granularity at the moment of write; a second export within the same
//! minute overwrites the first, an accepted granularity trade-off. Early
//! artifacts route to a separate directory from final ones so the delivery
//! queue can apply different disposition policies if ever needed.

use crate::results::RaceResults;
use crate::{Error, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory layout for produced and delivered artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// Final-results artifacts.
    pub output_dir: PathBuf,
    /// Early (race-start) artifacts.
    pub raceinfo_dir: PathBuf,
    /// Artifacts relocated after confirmed delivery.
    pub sent_dir: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::rooted_at(Path::new("."))
    }
}

impl ArtifactPaths {
    /// Standard layout under `root`.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            output_dir: root.join("output"),
            raceinfo_dir: root.join("raceinfo"),
            sent_dir: root.join("sent"),
        }
    }

    /// Directories the delivery queue drains, in flush order.
    pub fn upload_dirs(&self) -> [&Path; 2] {
        [self.output_dir.as_path(), self.raceinfo_dir.as_path()]
    }
}

/// Writes result artifacts into the configured directories.
pub struct ArtifactWriter {
    paths: ArtifactPaths,
}

impl ArtifactWriter {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    /// Write the structured JSON artifact.
    ///
    /// `early` routes the file to the race-info directory instead of the
    /// final-results directory. The target directory is created if absent.
    pub fn write_json(&self, results: &RaceResults, early: bool) -> Result<PathBuf> {
        let dir = if early { &self.paths.raceinfo_dir } else { &self.paths.output_dir };
        std::fs::create_dir_all(dir).map_err(|e| Error::file_error(dir.clone(), e))?;

        let path = dir.join(format!("{}.json", artifact_stem(Local::now())));
        let body = serde_json::to_vec_pretty(results)
            .map_err(|e| Error::parse_error("result serialization", e.to_string()))?;
        std::fs::write(&path, body).map_err(|e| Error::file_error(path.clone(), e))?;

        info!(
            "JSON results logged to {} for {} participants",
            path.display(),
            results.drivers.len()
        );
        Ok(path)
    }

    /// Write the flat CSV artifact into the final-results directory.
    pub fn write_csv(&self, results: &RaceResults) -> Result<PathBuf> {
        let dir = &self.paths.output_dir;
        std::fs::create_dir_all(dir).map_err(|e| Error::file_error(dir.clone(), e))?;

        let path = dir.join(format!("{}.csv", artifact_stem(Local::now())));
        let mut table = String::new();
        table.push_str("\"Session Name\",\"TrackName\",\"Position\",\"DriverName\",\"CarName\"\n");
        for row in &results.drivers {
            table.push_str(&format!(
                "\"{}\",\"{}\",{},\"{}\",\"{}\"\n",
                results.session_name, results.track_name, row.position, row.driver_name, row.car_name
            ));
        }
        std::fs::write(&path, table).map_err(|e| Error::file_error(path.clone(), e))?;

        info!(
            "CSV results logged to {} for {} participants",
            path.display(),
            results.drivers.len()
        );
        Ok(path)
    }
}

/// Minute-granularity artifact name stem.
fn artifact_stem(now: DateTime<Local>) -> String {
    now.format("results_%Y%m%d_%H%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultRecord;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sample_results() -> RaceResults {
        RaceResults {
            session_name: "Race".to_string(),
            track_name: "Monza".to_string(),
            track_layout: "GP".to_string(),
            drivers: vec![
                ResultRecord {
                    position: 1,
                    driver_name: "O\"Brien".to_string(),
                    car_name: "Back\\slash GT".to_string(),
                    car_class: "GT3".to_string(),
                },
                ResultRecord {
                    position: 2,
                    driver_name: "Bob".to_string(),
                    car_name: "Aventador".to_string(),
                    car_class: "Hyper".to_string(),
                },
            ],
        }
    }

    #[test]
    fn stem_has_minute_granularity() {
        let ts = Local.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        assert_eq!(artifact_stem(ts), "results_20260314_1509");
    }

    #[test]
    fn json_artifact_round_trips_escaped_strings() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(ArtifactPaths::rooted_at(dir.path()));

        let path = writer.write_json(&sample_results(), false).unwrap();
        assert!(path.starts_with(dir.path().join("output")));

        let raw = std::fs::read_to_string(&path).unwrap();
        // Quote and backslash are escaped on disk...
        assert!(raw.contains(r#"O\"Brien"#));
        assert!(raw.contains(r#"Back\\slash GT"#));

        // ...and parse back to the identical display strings.
        let parsed: RaceResults = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, sample_results());
    }

    #[test]
    fn early_artifacts_route_to_raceinfo() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(ArtifactPaths::rooted_at(dir.path()));

        let path = writer.write_json(&sample_results(), true).unwrap();
        assert!(path.starts_with(dir.path().join("raceinfo")));
    }

    #[test]
    fn csv_artifact_has_header_and_quoted_cells() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(ArtifactPaths::rooted_at(dir.path()));

        let path = writer.write_csv(&sample_results()).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Session Name\",\"TrackName\",\"Position\",\"DriverName\",\"CarName\""
        );
        assert_eq!(lines.next().unwrap(), "\"Race\",\"Monza\",1,\"O\"Brien\",\"Back\\slash GT\"");
        assert_eq!(lines.next().unwrap(), "\"Race\",\"Monza\",2,\"Bob\",\"Aventador\"");
        assert_eq!(lines.next(), None);
    }

    proptest! {
        #[test]
        fn arbitrary_driver_names_round_trip_through_json(name in ".*", car in ".*") {
            let results = RaceResults {
                session_name: "Race".to_string(),
                track_name: "Monza".to_string(),
                track_layout: "GP".to_string(),
                drivers: vec![ResultRecord {
                    position: 1,
                    driver_name: name,
                    car_name: car,
                    car_class: "GT3".to_string(),
                }],
            };

            let body = serde_json::to_string(&results).unwrap();
            let parsed: RaceResults = serde_json::from_str(&body).unwrap();
            prop_assert_eq!(parsed, results);
        }
    }
}
