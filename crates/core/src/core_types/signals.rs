//! Source signals supplied by the data-acquisition layer
//!
//! These types mirror the already-parsed records handed to the core:
//! satellite hotspot tables, official fire reports, an Open-Meteo style
//! weather snapshot, a ground sensor reading and a vegetation profile.
//! Every field that an upstream provider may omit is optional so that a
//! partial record degrades to an abstaining vote or a sentinel feature
//! instead of failing deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five independent signal sources considered in a detection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Satellite thermal hotspot count
    Satellite,
    /// Official agency fire report count
    Official,
    /// Current weather snapshot
    Weather,
    /// Ground IoT sensor reading
    Sensor,
    /// Vegetation profile (informational only)
    Vegetation,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Satellite => "satellite",
            SourceKind::Official => "official",
            SourceKind::Weather => "weather",
            SourceKind::Sensor => "sensor",
            SourceKind::Vegetation => "vegetation",
        };
        f.write_str(name)
    }
}

/// One satellite-detected thermal anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub latitude: f64,
    pub longitude: f64,
    /// Brightness temperature (K), when the product carries it
    #[serde(default)]
    pub brightness: Option<f64>,
    /// Detection confidence (0-100), when the product carries it
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Satellite hotspot table: a count plus optional rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotspotReport {
    pub count: usize,
    #[serde(default)]
    pub rows: Vec<Hotspot>,
}

impl HotspotReport {
    /// Build a report whose count matches its rows.
    pub fn from_rows(rows: Vec<Hotspot>) -> Self {
        Self {
            count: rows.len(),
            rows,
        }
    }
}

/// One agency-reported active fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireReport {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub hectares: Option<f64>,
}

/// Official fire report table: a count plus optional rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficialReportSet {
    pub count: usize,
    #[serde(default)]
    pub rows: Vec<FireReport>,
}

impl OfficialReportSet {
    /// Build a report set whose count matches its rows.
    pub fn from_rows(rows: Vec<FireReport>) -> Self {
        Self {
            count: rows.len(),
            rows,
        }
    }
}

/// `current` block of a weather snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Air temperature at 2 m (°C)
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    /// Relative humidity at 2 m (%)
    #[serde(default)]
    pub relative_humidity_2m: Option<f64>,
    /// Wind speed at 10 m (km/h)
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
    /// Precipitation (mm)
    #[serde(default)]
    pub precipitation: Option<f64>,
}

/// Weather snapshot shaped `{current: {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default)]
    pub current: Option<CurrentConditions>,
}

impl WeatherSnapshot {
    /// Snapshot with temperature and humidity set.
    pub fn new(temperature_2m: f64, relative_humidity_2m: f64) -> Self {
        Self {
            current: Some(CurrentConditions {
                temperature_2m: Some(temperature_2m),
                relative_humidity_2m: Some(relative_humidity_2m),
                ..CurrentConditions::default()
            }),
        }
    }

    /// Add a wind speed reading (km/h).
    pub fn with_wind_speed(mut self, wind_speed_10m: f64) -> Self {
        self.current
            .get_or_insert_with(CurrentConditions::default)
            .wind_speed_10m = Some(wind_speed_10m);
        self
    }

    pub fn temperature(&self) -> Option<f64> {
        self.current.as_ref().and_then(|c| c.temperature_2m)
    }

    pub fn humidity(&self) -> Option<f64> {
        self.current.as_ref().and_then(|c| c.relative_humidity_2m)
    }

    pub fn wind_speed(&self) -> Option<f64> {
        self.current.as_ref().and_then(|c| c.wind_speed_10m)
    }
}

/// Ground sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor air temperature (°C)
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Smoke level on a 0-100 scale
    #[serde(default)]
    pub smoke_level: Option<f64>,
    /// Relative humidity (%)
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub air_quality_index: Option<u32>,
    #[serde(default)]
    pub flame_detected: bool,
}

impl SensorReading {
    pub fn new(temperature: f64, smoke_level: f64, flame_detected: bool) -> Self {
        Self {
            temperature: Some(temperature),
            smoke_level: Some(smoke_level),
            humidity: None,
            air_quality_index: None,
            flame_detected,
        }
    }
}

/// Land-cover profile around the observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VegetationProfile {
    #[serde(default)]
    pub has_forest: bool,
    #[serde(default)]
    pub has_wetland: bool,
    #[serde(default)]
    pub has_grassland: bool,
    #[serde(default)]
    pub vegetation_types: Vec<String>,
    #[serde(default)]
    pub fire_risk_areas: Vec<String>,
    #[serde(default)]
    pub region: String,
}

/// All signals gathered for one detection cycle. Any source may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    #[serde(default)]
    pub satellite: Option<HotspotReport>,
    #[serde(default)]
    pub official: Option<OfficialReportSet>,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub sensor: Option<SensorReading>,
    #[serde(default)]
    pub vegetation: Option<VegetationProfile>,
}
