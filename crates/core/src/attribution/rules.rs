//! Rule-based cause attribution
//!
//! Used when no trained model is loaded or the model cannot score a record.
//! Rules are checked in priority order and the first match wins; NaN
//! features never satisfy a comparison.

use super::classifier::CauseLabel;
use super::features::AttributionFeatureRecord;

/// Rule thresholds.
pub mod thresholds {
    /// `infra_density` at or above this puts the fire beside infrastructure (≤ 1 km)
    pub const INFRA_ADJACENT: f64 = 0.5;
    /// `infra_density` at or above this is within commuting reach (≤ 4 km)
    pub const INFRA_NEARBY: f64 = 0.2;
    /// Population value treated as settled land
    pub const SETTLED_POPULATION: f64 = 100.0;
    /// Local hours of typical human activity (inclusive)
    pub const ACTIVE_HOURS: std::ops::RangeInclusive<f64> = 8.0..=20.0;
    /// Hot-dry conditions for self-heating fuels
    pub const HOT_TEMPERATURE: f64 = 30.0;
    pub const DRY_HUMIDITY: f64 = 30.0;
}

/// Attribute a cause from the feature record alone.
///
/// Returns the label and a fixed rule confidence.
pub fn attribute(record: &AttributionFeatureRecord) -> (CauseLabel, f64) {
    if record.lightning_recent == 1.0 {
        return (CauseLabel::Lightning, 0.8);
    }

    if record.flame_detected == 1.0 && record.infra_density >= thresholds::INFRA_ADJACENT {
        return (CauseLabel::EquipmentFailure, 0.6);
    }

    let settled = record.pop_density >= thresholds::SETTLED_POPULATION;
    let active_nearby = thresholds::ACTIVE_HOURS.contains(&record.hour)
        && record.infra_density >= thresholds::INFRA_NEARBY;
    if settled || active_nearby {
        return (CauseLabel::HumanActivity, 0.55);
    }

    if record.temperature > thresholds::HOT_TEMPERATURE
        && record.humidity < thresholds::DRY_HUMIDITY
    {
        return (CauseLabel::SpontaneousCombustion, 0.5);
    }

    (CauseLabel::HumanActivity, 0.4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AttributionFeatureRecord {
        AttributionFeatureRecord::unknown()
    }

    #[test]
    fn test_recent_lightning_wins() {
        let r = AttributionFeatureRecord {
            lightning_recent: 1.0,
            pop_density: 5000.0,
            ..record()
        };
        assert_eq!(attribute(&r).0, CauseLabel::Lightning);
    }

    #[test]
    fn test_flame_beside_infrastructure_is_equipment() {
        let r = AttributionFeatureRecord {
            lightning_recent: 0.0,
            flame_detected: 1.0,
            infra_density: 0.8,
            ..record()
        };
        assert_eq!(attribute(&r).0, CauseLabel::EquipmentFailure);
    }

    #[test]
    fn test_settled_area_is_human() {
        let r = AttributionFeatureRecord {
            pop_density: 250.0,
            ..record()
        };
        assert_eq!(attribute(&r), (CauseLabel::HumanActivity, 0.55));
    }

    #[test]
    fn test_hot_dry_remote_is_spontaneous() {
        let r = AttributionFeatureRecord {
            lightning_recent: 0.0,
            pop_density: 2.0,
            infra_density: 0.01,
            hour: 3.0,
            temperature: 36.0,
            humidity: 12.0,
            ..record()
        };
        assert_eq!(attribute(&r).0, CauseLabel::SpontaneousCombustion);
    }

    #[test]
    fn test_all_unknown_falls_through() {
        assert_eq!(attribute(&record()), (CauseLabel::HumanActivity, 0.4));
    }
}
