//! Multi-source fire detection by voting
//!
//! Each source casts at most one vote under a fixed rule and the cycle
//! declares fire when two or more sources agree. The vote is deterministic
//! and pure: an absent or failed source abstains instead of raising.
//!
//! | Source    | Votes for fire when                              |
//! |-----------|--------------------------------------------------|
//! | satellite | hotspot count > 0                                |
//! | official  | report count > 0                                 |
//! | weather   | temperature > 30 °C and humidity < 30 %          |
//! | sensor    | sensor risk is HIGH/MEDIUM, or a flame is seen   |
//!
//! Vegetation only contributes the informational [`VegetationRisk`].

pub mod hotspots;
pub mod risk;

pub use hotspots::cluster_area_ha;
pub use risk::{OverallRisk, SensorRisk, VegetationRisk};

use crate::core_types::{SignalBundle, SourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Votes required to declare a fire.
pub const FIRE_VOTE_THRESHOLD: u32 = 2;

/// Weather vote thresholds.
pub mod weather_thresholds {
    /// Air temperature must exceed this (°C)
    pub const TEMPERATURE: f64 = 30.0;
    /// Relative humidity must be below this (%)
    pub const HUMIDITY: f64 = 30.0;
}

/// Outcome of one detection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub fire_detected: bool,
    pub votes: u32,
    pub total_votes: u32,
    /// One line per affirmative vote, in source order
    pub evidence: Vec<String>,
    pub vegetation_risk: VegetationRisk,
    /// Sensor risk when a sensor reading was supplied
    pub sensor_risk: Option<SensorRisk>,
    pub timestamp: DateTime<Utc>,
}

impl DetectionVerdict {
    /// Fraction of participating sources that voted for fire.
    pub fn vote_ratio(&self) -> f64 {
        if self.total_votes == 0 {
            0.0
        } else {
            f64::from(self.votes) / f64::from(self.total_votes)
        }
    }
}

/// Ballot from one source.
enum Ballot {
    /// Source participated and voted for fire, with its evidence line
    Fire(String),
    /// Source participated and voted no fire
    NoFire,
    /// Source did not participate and is excluded from the total
    Excluded,
}

/// Run the vote over a signal bundle, stamping the verdict with `timestamp`.
///
/// Absent satellite, official and sensor payloads abstain but still count
/// toward `total_votes`; absent weather (or weather lacking temperature or
/// humidity) is excluded from the total.
pub fn vote(signals: &SignalBundle, timestamp: DateTime<Utc>) -> DetectionVerdict {
    let sensor_risk = signals.sensor.as_ref().map(SensorRisk::assess);

    let ballots = [
        (SourceKind::Satellite, satellite_ballot(signals)),
        (SourceKind::Official, official_ballot(signals)),
        (SourceKind::Weather, weather_ballot(signals)),
        (SourceKind::Sensor, sensor_ballot(signals, sensor_risk)),
    ];

    let mut votes = 0;
    let mut total_votes = 0;
    let mut evidence = Vec::new();

    for (source, ballot) in ballots {
        match ballot {
            Ballot::Fire(line) => {
                debug!(%source, "vote: fire");
                votes += 1;
                total_votes += 1;
                evidence.push(line);
            }
            Ballot::NoFire => {
                debug!(%source, "vote: no fire");
                total_votes += 1;
            }
            Ballot::Excluded => {
                debug!(%source, "source missing, excluded from vote");
            }
        }
    }

    let vegetation_risk = VegetationRisk::assess(signals.vegetation.as_ref());
    debug!(source = %SourceKind::Vegetation, %vegetation_risk, "informational");

    DetectionVerdict {
        fire_detected: votes >= FIRE_VOTE_THRESHOLD,
        votes,
        total_votes,
        evidence,
        vegetation_risk,
        sensor_risk,
        timestamp,
    }
}

fn satellite_ballot(signals: &SignalBundle) -> Ballot {
    match &signals.satellite {
        Some(report) if report.count > 0 => {
            Ballot::Fire(format!("Satellite: {} hotspots detected", report.count))
        }
        _ => Ballot::NoFire,
    }
}

fn official_ballot(signals: &SignalBundle) -> Ballot {
    match &signals.official {
        Some(reports) if reports.count > 0 => {
            Ballot::Fire(format!("Official: {} fires reported", reports.count))
        }
        _ => Ballot::NoFire,
    }
}

fn weather_ballot(signals: &SignalBundle) -> Ballot {
    let Some(weather) = &signals.weather else {
        return Ballot::Excluded;
    };
    let (Some(temperature), Some(humidity)) = (weather.temperature(), weather.humidity()) else {
        return Ballot::Excluded;
    };

    if temperature > weather_thresholds::TEMPERATURE && humidity < weather_thresholds::HUMIDITY {
        Ballot::Fire(format!(
            "Weather: {temperature}°C, {humidity}% humidity - High risk"
        ))
    } else {
        Ballot::NoFire
    }
}

fn sensor_ballot(signals: &SignalBundle, risk: Option<SensorRisk>) -> Ballot {
    match (&signals.sensor, risk) {
        (Some(reading), Some(risk)) if risk.is_elevated() || reading.flame_detected => {
            Ballot::Fire(format!(
                "Sensor: {risk} risk, flame={}",
                reading.flame_detected
            ))
        }
        _ => Ballot::NoFire,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{HotspotReport, OfficialReportSet, SensorReading, WeatherSnapshot};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, 15, 0, 0).unwrap()
    }

    fn count(satellite: usize, official: usize) -> SignalBundle {
        SignalBundle {
            satellite: Some(HotspotReport {
                count: satellite,
                rows: Vec::new(),
            }),
            official: Some(OfficialReportSet {
                count: official,
                rows: Vec::new(),
            }),
            ..SignalBundle::default()
        }
    }

    #[test]
    fn test_reference_detection_scenario() {
        let signals = SignalBundle {
            weather: Some(WeatherSnapshot::new(35.0, 20.0)),
            sensor: Some(SensorReading::new(25.0, 10.0, true)),
            ..count(3, 0)
        };

        let verdict = vote(&signals, at());
        assert_eq!(verdict.votes, 3);
        assert_eq!(verdict.total_votes, 4);
        assert!(verdict.fire_detected);
        assert_eq!(verdict.evidence.len(), 3);
        assert!(verdict.evidence[0].starts_with("Satellite"));
        assert!(verdict.evidence[1].starts_with("Weather"));
        assert!(verdict.evidence[2].starts_with("Sensor"));
    }

    #[test]
    fn test_missing_weather_excluded_from_total() {
        let with_weather = SignalBundle {
            weather: Some(WeatherSnapshot::new(20.0, 60.0)),
            sensor: Some(SensorReading::new(20.0, 10.0, false)),
            ..count(0, 0)
        };
        let without_weather = SignalBundle {
            weather: None,
            ..with_weather.clone()
        };

        let a = vote(&with_weather, at());
        let b = vote(&without_weather, at());
        assert_eq!(a.total_votes, 4);
        assert_eq!(b.total_votes, 3);
        assert_eq!(a.votes, b.votes);
    }

    #[test]
    fn test_weather_without_humidity_is_excluded() {
        let mut weather = WeatherSnapshot::new(40.0, 10.0);
        if let Some(current) = weather.current.as_mut() {
            current.relative_humidity_2m = None;
        }
        let signals = SignalBundle {
            weather: Some(weather),
            ..count(1, 1)
        };
        let verdict = vote(&signals, at());
        assert_eq!(verdict.total_votes, 3);
        assert_eq!(verdict.votes, 2);
    }

    #[test]
    fn test_single_vote_is_not_fire() {
        let verdict = vote(&count(5, 0), at());
        assert_eq!(verdict.votes, 1);
        assert!(!verdict.fire_detected);
    }

    #[test]
    fn test_all_sources_absent() {
        let verdict = vote(&SignalBundle::default(), at());
        assert_eq!(verdict.votes, 0);
        assert_eq!(verdict.total_votes, 3);
        assert!(!verdict.fire_detected);
        assert_eq!(verdict.vegetation_risk, VegetationRisk::Unknown);
        assert!(verdict.sensor_risk.is_none());
        assert_eq!(verdict.vote_ratio(), 0.0);
    }
}
