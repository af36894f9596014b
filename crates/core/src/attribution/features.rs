//! Flat feature record scored by the cause classifier
//!
//! Every field is an `f64`. Features that could not be derived carry the
//! [`UNKNOWN`] sentinel (NaN); booleans are encoded as 0.0 / 1.0.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for a feature that could not be derived.
pub const UNKNOWN: f64 = f64::NAN;

/// Feature columns in model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    LightningRecent,
    InfraDensity,
    PopDensity,
    Hour,
    DayOfWeek,
    Temperature,
    Humidity,
    WindSpeed,
    IotTemp,
    SmokeLevel,
    FlameDetected,
    VegetationInfluence,
}

impl Feature {
    /// Number of feature columns
    pub const COUNT: usize = 12;

    /// All columns in the order models expect them.
    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::LightningRecent,
        Feature::InfraDensity,
        Feature::PopDensity,
        Feature::Hour,
        Feature::DayOfWeek,
        Feature::Temperature,
        Feature::Humidity,
        Feature::WindSpeed,
        Feature::IotTemp,
        Feature::SmokeLevel,
        Feature::FlameDetected,
        Feature::VegetationInfluence,
    ];

    /// Column position in a feature vector.
    #[inline]
    pub fn column(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::LightningRecent => "lightning_recent",
            Feature::InfraDensity => "infra_density",
            Feature::PopDensity => "pop_density",
            Feature::Hour => "hour",
            Feature::DayOfWeek => "day_of_week",
            Feature::Temperature => "temperature",
            Feature::Humidity => "humidity",
            Feature::WindSpeed => "wind_speed",
            Feature::IotTemp => "iot_temp",
            Feature::SmokeLevel => "smoke_level",
            Feature::FlameDetected => "flame_detected",
            Feature::VegetationInfluence => "vegetation_influence",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Features derived for one fire observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributionFeatureRecord {
    /// 1 if the nearest strike fell within the lightning window, else 0
    #[serde(with = "unknown_as_null")]
    pub lightning_recent: f64,
    /// `1 / (distance_km + 1)` to the nearest infrastructure point
    #[serde(with = "unknown_as_null")]
    pub infra_density: f64,
    /// Population value of the nearest population point
    #[serde(with = "unknown_as_null")]
    pub pop_density: f64,
    /// Local hour of day (0-23)
    #[serde(with = "unknown_as_null")]
    pub hour: f64,
    /// Local day of week, Monday = 0
    #[serde(with = "unknown_as_null")]
    pub day_of_week: f64,
    #[serde(with = "unknown_as_null")]
    pub temperature: f64,
    #[serde(with = "unknown_as_null")]
    pub humidity: f64,
    #[serde(with = "unknown_as_null")]
    pub wind_speed: f64,
    #[serde(with = "unknown_as_null")]
    pub iot_temp: f64,
    #[serde(with = "unknown_as_null")]
    pub smoke_level: f64,
    /// 1 if a sensor reported flame, else 0
    #[serde(with = "unknown_as_null")]
    pub flame_detected: f64,
    /// Number of fire-risk land-cover areas in the vegetation profile
    #[serde(with = "unknown_as_null")]
    pub vegetation_influence: f64,
}

/// Serde adapter writing [`UNKNOWN`] as `null` and reading `null` back as
/// [`UNKNOWN`], so records with missing features survive a JSON round trip.
mod unknown_as_null {
    use super::UNKNOWN;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(UNKNOWN))
    }
}

impl AttributionFeatureRecord {
    /// Record with every feature unknown except the count/flag features,
    /// which default to zero.
    pub fn unknown() -> Self {
        Self {
            lightning_recent: UNKNOWN,
            infra_density: UNKNOWN,
            pop_density: UNKNOWN,
            hour: UNKNOWN,
            day_of_week: UNKNOWN,
            temperature: UNKNOWN,
            humidity: UNKNOWN,
            wind_speed: UNKNOWN,
            iot_temp: UNKNOWN,
            smoke_level: UNKNOWN,
            flame_detected: 0.0,
            vegetation_influence: 0.0,
        }
    }

    /// Value of one feature column.
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::LightningRecent => self.lightning_recent,
            Feature::InfraDensity => self.infra_density,
            Feature::PopDensity => self.pop_density,
            Feature::Hour => self.hour,
            Feature::DayOfWeek => self.day_of_week,
            Feature::Temperature => self.temperature,
            Feature::Humidity => self.humidity,
            Feature::WindSpeed => self.wind_speed,
            Feature::IotTemp => self.iot_temp,
            Feature::SmokeLevel => self.smoke_level,
            Feature::FlameDetected => self.flame_detected,
            Feature::VegetationInfluence => self.vegetation_influence,
        }
    }

    /// Feature vector in [`Feature::ALL`] order.
    pub fn to_vector(&self) -> [f64; Feature::COUNT] {
        Feature::ALL.map(|feature| self.get(feature))
    }

    /// Features holding the unknown sentinel.
    pub fn unknown_features(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|&feature| self.get(feature).is_nan())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_follow_declaration_order() {
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.column(), i);
        }
    }

    #[test]
    fn test_vector_matches_fields() {
        let record = AttributionFeatureRecord {
            hour: 14.0,
            smoke_level: 72.5,
            ..AttributionFeatureRecord::unknown()
        };
        let vector = record.to_vector();
        assert_eq!(vector[Feature::Hour.column()], 14.0);
        assert_eq!(vector[Feature::SmokeLevel.column()], 72.5);
        assert!(vector[Feature::Temperature.column()].is_nan());
    }

    #[test]
    fn test_unknown_features_lists_sentinels() {
        let record = AttributionFeatureRecord::unknown();
        let unknown = record.unknown_features();
        assert_eq!(unknown.len(), 10);
        assert!(!unknown.contains(&Feature::FlameDetected));
    }

    #[test]
    fn test_unknown_features_round_trip_as_null() {
        let record = AttributionFeatureRecord {
            hour: 9.0,
            ..AttributionFeatureRecord::unknown()
        };
        let json = serde_json::to_value(record).unwrap();
        assert!(json["pop_density"].is_null());
        assert_eq!(json["hour"], 9.0);
        assert_eq!(json["flame_detected"], 0.0);

        let back: AttributionFeatureRecord = serde_json::from_value(json).unwrap();
        assert!(back.pop_density.is_nan());
        assert_eq!(back.hour, 9.0);
        assert_eq!(back.unknown_features(), record.unknown_features());
    }
}
