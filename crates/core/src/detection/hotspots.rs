//! Hotspot cluster footprint
//!
//! A quick burned-area estimate from the satellite rows of one cycle: the
//! convex hull of the hotspot positions on the local plane.

use crate::core_types::{GeoPoint, HotspotReport, LocalProjection};
use nalgebra::Point2;

/// Hectares per square kilometre
const HECTARES_PER_KM2: f64 = 100.0;

/// Estimated area (ha) covered by the convex hull of a hotspot cluster.
///
/// Fewer than three valid rows, or collinear rows, give 0. Rows with
/// invalid coordinates are skipped.
pub fn cluster_area_ha(report: &HotspotReport) -> f64 {
    let points: Vec<GeoPoint> = report
        .rows
        .iter()
        .map(|row| GeoPoint::new(row.latitude, row.longitude))
        .filter(GeoPoint::is_valid)
        .collect();

    if points.len() < 3 {
        return 0.0;
    }

    let mean_latitude = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
    let projection = LocalProjection::new(mean_latitude);
    let planar: Vec<Point2<f64>> = points.iter().map(|p| projection.project(p)).collect();

    polygon_area(&convex_hull(planar)) * HECTARES_PER_KM2
}

/// Andrew's monotone chain; returns the hull counter-clockwise without the
/// closing point.
fn convex_hull(mut points: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup();

    if points.len() < 3 {
        return points;
    }

    let cross = |o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(points.len() * 2);

    // Lower hull
    for p in &points {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }

    // Upper hull
    let lower_len = hull.len() + 1;
    for p in points.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(*p);
    }

    hull.pop();
    hull
}

/// Shoelace area of a simple polygon.
fn polygon_area(vertices: &[Point2<f64>]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let twice_area: f64 = vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice_area.abs() / 2.0
}
