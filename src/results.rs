//! Projection of a snapshot into exportable standings.

use crate::schema::TelemetrySnapshot;
use serde::{Deserialize, Serialize};

/// Ordering applied to aggregated standings.
///
/// Position order is the default. Car-name order is an operator convenience
/// for manually-curated pre-race grids, selected when early export is
/// combined with uploads disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    ByPosition,
    ByCarName,
}

/// One row of the exported standings. Constructed fresh at export time and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "Position")]
    pub position: u32,
    #[serde(rename = "DriverName")]
    pub driver_name: String,
    #[serde(rename = "CarName")]
    pub car_name: String,
    #[serde(rename = "CarClass")]
    pub car_class: String,
}

/// Aggregated standings for one export event. Field names follow the
/// collector's expected document keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResults {
    #[serde(rename = "Session Name")]
    pub session_name: String,
    #[serde(rename = "TrackName")]
    pub track_name: String,
    #[serde(rename = "TrackLayout")]
    pub track_layout: String,
    #[serde(rename = "Drivers")]
    pub drivers: Vec<ResultRecord>,
}

/// Project a snapshot into sorted, filtered standings.
///
/// Inactive participant slots are dropped and the count is capped at the
/// stored slot range. Output is deterministic for identical input and order.
pub fn aggregate(snapshot: &TelemetrySnapshot, order: SortOrder) -> RaceResults {
    let track_name = prefer_translated(
        &snapshot.translated_track_location,
        &snapshot.track_location,
    );
    let track_layout = prefer_translated(
        &snapshot.translated_track_variation,
        &snapshot.track_variation,
    );

    let mut drivers: Vec<ResultRecord> = (0..snapshot.participant_count())
        .filter(|&i| snapshot.participants[i].is_active)
        .map(|i| ResultRecord {
            position: snapshot.participants[i].race_position,
            driver_name: snapshot.participants[i].name.clone(),
            car_name: snapshot.car_names[i].clone(),
            car_class: snapshot.car_class_names[i].clone(),
        })
        .collect();

    match order {
        SortOrder::ByPosition => drivers.sort_by_key(|d| d.position),
        SortOrder::ByCarName => drivers.sort_by(|a, b| a.car_name.cmp(&b.car_name)),
    }

    RaceResults {
        session_name: snapshot.session_state.name().to_string(),
        track_name,
        track_layout,
        drivers,
    }
}

fn prefer_translated(translated: &str, fallback: &str) -> String {
    if translated.is_empty() { fallback.to_string() } else { translated.to_string() }
}
