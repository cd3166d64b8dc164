//! User statistics payload returned by the analytics server

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Precomputed statistics summary for one subject.
///
/// Fetched fresh on every request; never mutated or cached locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: String,
    #[serde(default)]
    pub total_locations: u64,
    #[serde(default)]
    pub distance_traveled_meters: f64,
    /// Null when the subject has no recorded locations
    #[serde(default)]
    pub first_location_timestamp: Option<i64>,
    #[serde(default)]
    pub last_location_timestamp: Option<i64>,
    /// City name -> visit count
    #[serde(default)]
    pub city_visits: BTreeMap<String, u64>,
    #[serde(default)]
    pub common_stops: Vec<LocationStop>,
    /// Hour of day (0-23) -> sample count
    #[serde(default)]
    pub activity_hours: BTreeMap<u8, u64>,
}

/// A frequently visited stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStop {
    pub latitude: f64,
    pub longitude: f64,
    pub visit_count: u64,
    pub average_duration_minutes: f64,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserStatistics {
    /// Total distance in kilometres.
    pub fn distance_traveled_km(&self) -> f64 {
        self.distance_traveled_meters / 1000.0
    }

    /// Hour of day with the most activity (lowest hour wins ties).
    pub fn busiest_hour(&self) -> Option<(u8, u64)> {
        self.activity_hours
            .iter()
            .fold(None, |best: Option<(u8, u64)>, (&hour, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((hour, count)),
            })
    }

    /// Most visited city (alphabetically first on ties).
    pub fn top_city(&self) -> Option<(&str, u64)> {
        self.city_visits
            .iter()
            .fold(None, |best: Option<(&str, u64)>, (city, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((city.as_str(), count)),
            })
    }
}
