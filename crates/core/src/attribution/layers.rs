//! Static reference layers for spatial joins
//!
//! Lightning strikes, population points and infrastructure points are
//! loaded once, projected onto a shared local plane and indexed. The set is
//! immutable after construction and is shared between requests behind an
//! `Arc`.

use crate::core_types::{GeoPoint, LocalProjection, Nearest, SpatialIndex};
use crate::error::{EcoFlareError, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Anything with a geographic position.
pub trait Located {
    fn location(&self) -> GeoPoint;
}

/// One recorded lightning strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightningStrike {
    pub latitude: f64,
    pub longitude: f64,
    pub strike_time: DateTime<Utc>,
}

/// One population sample point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Population value (people per km² in the source census grid)
    pub population: f64,
}

/// One infrastructure asset (power line tower, rail siding, road junction...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructurePoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub kind: Option<String>,
}

macro_rules! impl_located {
    ($($ty:ty),*) => {
        $(impl Located for $ty {
            #[inline]
            fn location(&self) -> GeoPoint {
                GeoPoint::new(self.latitude, self.longitude)
            }
        })*
    };
}

impl_located!(LightningStrike, PopulationPoint, InfrastructurePoint);

/// An indexed, read-only set of located records.
#[derive(Debug, Clone)]
pub struct ReferenceLayer<R> {
    name: &'static str,
    records: Vec<R>,
    index: SpatialIndex,
}

impl<R: Located> ReferenceLayer<R> {
    fn build(
        name: &'static str,
        records: Vec<R>,
        projection: &LocalProjection,
        cell_km: f64,
    ) -> Self {
        let points = records
            .iter()
            .map(|r| projection.project(&r.location()))
            .collect();
        Self {
            name,
            records,
            index: SpatialIndex::build(points, cell_km),
        }
    }

    /// Nearest record to a projected point together with its distance (km).
    ///
    /// `None` when the layer is empty.
    pub fn nearest(&self, point: &Point2<f64>) -> Option<(&R, f64)> {
        self.index
            .nearest(point)
            .map(|Nearest { index, distance }| (&self.records[index], distance))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Serializable description of the three layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLayerSpec {
    #[serde(default)]
    pub lightning: Vec<LightningStrike>,
    #[serde(default)]
    pub population: Vec<PopulationPoint>,
    #[serde(default)]
    pub infrastructure: Vec<InfrastructurePoint>,
    /// Local calendar offset from UTC (hours) for temporal features
    #[serde(default)]
    pub utc_offset_hours: f64,
}

/// The three reference layers, projected and indexed.
#[derive(Debug, Clone)]
pub struct ReferenceLayers {
    pub lightning: ReferenceLayer<LightningStrike>,
    pub population: ReferenceLayer<PopulationPoint>,
    pub infrastructure: ReferenceLayer<InfrastructurePoint>,
    projection: LocalProjection,
    local_offset: FixedOffset,
}

impl ReferenceLayers {
    /// Validate, project and index the layers described by `spec`.
    ///
    /// The projection is anchored on the mean latitude of all layer points.
    /// Any malformed coordinate rejects the whole set with
    /// [`EcoFlareError::InvalidGeometry`].
    pub fn build(spec: ReferenceLayerSpec, cell_km: f64) -> Result<Self> {
        validate_layer("lightning layer", &spec.lightning)?;
        validate_layer("population layer", &spec.population)?;
        validate_layer("infrastructure layer", &spec.infrastructure)?;

        let local_offset = offset_from_hours(spec.utc_offset_hours)?;

        let latitudes: Vec<f64> = spec
            .lightning
            .iter()
            .map(|r| r.latitude)
            .chain(spec.population.iter().map(|r| r.latitude))
            .chain(spec.infrastructure.iter().map(|r| r.latitude))
            .collect();
        let reference_latitude = if latitudes.is_empty() {
            0.0
        } else {
            latitudes.iter().sum::<f64>() / latitudes.len() as f64
        };
        let projection = LocalProjection::new(reference_latitude);

        Ok(Self {
            lightning: ReferenceLayer::build("lightning", spec.lightning, &projection, cell_km),
            population: ReferenceLayer::build("population", spec.population, &projection, cell_km),
            infrastructure: ReferenceLayer::build(
                "infrastructure",
                spec.infrastructure,
                &projection,
                cell_km,
            ),
            projection,
            local_offset,
        })
    }

    /// Layers with no records; every spatial feature resolves to unknown.
    pub fn empty() -> Self {
        let projection = LocalProjection::default();
        Self {
            lightning: ReferenceLayer::build("lightning", Vec::new(), &projection, 1.0),
            population: ReferenceLayer::build("population", Vec::new(), &projection, 1.0),
            infrastructure: ReferenceLayer::build("infrastructure", Vec::new(), &projection, 1.0),
            projection: LocalProjection::default(),
            local_offset: Utc.fix(),
        }
    }

    /// Shared projection of the layer set.
    pub fn projection(&self) -> &LocalProjection {
        &self.projection
    }

    /// Offset of the local calendar used for temporal features.
    pub fn local_offset(&self) -> FixedOffset {
        self.local_offset
    }
}

fn validate_layer<R: Located>(context: &str, records: &[R]) -> Result<()> {
    for record in records {
        let point = record.location();
        if !point.is_valid() {
            return Err(EcoFlareError::invalid_geometry(
                context,
                point.latitude,
                point.longitude,
            ));
        }
    }
    Ok(())
}

fn offset_from_hours(hours: f64) -> Result<FixedOffset> {
    if !hours.is_finite() {
        return Err(EcoFlareError::configuration(format!(
            "UTC offset must be finite, got {hours}"
        )));
    }
    let seconds = (hours * 3600.0).round() as i32;
    FixedOffset::east_opt(seconds).ok_or_else(|| {
        EcoFlareError::configuration(format!("UTC offset out of range: {hours} hours"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn strike(latitude: f64, longitude: f64) -> LightningStrike {
        LightningStrike {
            latitude,
            longitude,
            strike_time: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_build_rejects_malformed_points() {
        let spec = ReferenceLayerSpec {
            lightning: vec![strike(43.0, -79.0), strike(120.0, -79.0)],
            ..ReferenceLayerSpec::default()
        };
        let err = ReferenceLayers::build(spec, 10.0).unwrap_err();
        match err {
            EcoFlareError::InvalidGeometry { context, latitude, .. } => {
                assert_eq!(context, "lightning layer");
                assert_eq!(latitude, 120.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_projection_anchored_on_mean_latitude() {
        let spec = ReferenceLayerSpec {
            lightning: vec![strike(40.0, -79.0)],
            population: vec![PopulationPoint {
                latitude: 50.0,
                longitude: -79.0,
                population: 10.0,
            }],
            ..ReferenceLayerSpec::default()
        };
        let layers = ReferenceLayers::build(spec, 10.0).unwrap();
        assert_eq!(layers.projection().reference_latitude(), 45.0);
        assert_eq!(layers.lightning.len(), 1);
        assert!(layers.infrastructure.is_empty());
    }

    #[test]
    fn test_offset_hours_parsed() {
        let spec = ReferenceLayerSpec {
            utc_offset_hours: -4.0,
            ..ReferenceLayerSpec::default()
        };
        let layers = ReferenceLayers::build(spec, 10.0).unwrap();
        assert_eq!(layers.local_offset().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_offset_out_of_range() {
        let spec = ReferenceLayerSpec {
            utc_offset_hours: 30.0,
            ..ReferenceLayerSpec::default()
        };
        assert!(ReferenceLayers::build(spec, 10.0).is_err());
    }
}
