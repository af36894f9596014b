//! Uniform-grid spatial index for nearest-point queries
//!
//! Reference layers are bucketed into square cells keyed by a Morton code,
//! and nearest-neighbour lookups walk outward ring by ring from the query
//! cell. Only rings that can still contain a closer point are visited, so
//! lookups stay close to constant time as layers grow.

use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// Result of a nearest-neighbour lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Index of the matched point in insertion order
    pub index: usize,
    /// Planar distance to the matched point (same units as the index)
    pub distance: f64,
}

/// Spatial index using hash-based grid cells for fast neighbour queries
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cells: FxHashMap<u64, Vec<u32>>,
    points: Vec<Point2<f64>>,
    cell_size: f64,
    min_cell: (i32, i32),
    max_cell: (i32, i32),
}

impl SpatialIndex {
    /// Build an index over `points`, preserving their order as indices.
    ///
    /// `cell_size` is clamped to a small positive value so a zero or
    /// negative configuration cannot collapse every point into one key.
    pub fn build(points: Vec<Point2<f64>>, cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 1e-6 {
            cell_size
        } else {
            1.0
        };

        let mut index = SpatialIndex {
            cells: FxHashMap::default(),
            points: Vec::with_capacity(points.len()),
            cell_size,
            min_cell: (i32::MAX, i32::MAX),
            max_cell: (i32::MIN, i32::MIN),
        };

        for point in points {
            index.insert(point);
        }

        index
    }

    fn insert(&mut self, position: Point2<f64>) {
        let id = self.points.len() as u32;
        let (ix, iy) = self.cell_of(&position);
        self.min_cell = (self.min_cell.0.min(ix), self.min_cell.1.min(iy));
        self.max_cell = (self.max_cell.0.max(ix), self.max_cell.1.max(iy));
        self.cells.entry(morton_encode(ix, iy)).or_default().push(id);
        self.points.push(position);
    }

    #[inline]
    fn cell_of(&self, pos: &Point2<f64>) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Nearest indexed point to `query`.
    ///
    /// Ties on distance resolve to the lowest insertion index, i.e. the
    /// first occurrence in layer order. Returns `None` for an empty index.
    pub fn nearest(&self, query: &Point2<f64>) -> Option<Nearest> {
        if self.points.is_empty() {
            return None;
        }

        let (qx, qy) = self.cell_of(query);

        // Farthest ring that can hold any point at all
        let max_ring = [
            (qx - self.min_cell.0).abs(),
            (self.max_cell.0 - qx).abs(),
            (qy - self.min_cell.1).abs(),
            (self.max_cell.1 - qy).abs(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        // Rings closer than the occupied bounding box are empty
        let gap = |q: i32, lo: i32, hi: i32| (lo - q).max(q - hi).max(0);
        let min_ring = gap(qx, self.min_cell.0, self.max_cell.0)
            .max(gap(qy, self.min_cell.1, self.max_cell.1));

        let mut best: Option<Nearest> = None;

        for ring in min_ring..=max_ring {
            // Every point in ring k lies at least (k - 1) cells away
            if let Some(found) = best {
                let ring_floor = f64::from(ring - 1) * self.cell_size;
                if found.distance < ring_floor {
                    break;
                }
            }

            for (cx, cy) in ring_cells(qx, qy, ring) {
                let Some(ids) = self.cells.get(&morton_encode(cx, cy)) else {
                    continue;
                };
                for &id in ids {
                    let distance = (self.points[id as usize] - query).norm();
                    let candidate = Nearest {
                        index: id as usize,
                        distance,
                    };
                    best = match best {
                        Some(current)
                            if current.distance < distance
                                || (current.distance == distance
                                    && current.index < candidate.index) =>
                        {
                            Some(current)
                        }
                        _ => Some(candidate),
                    };
                }
            }
        }

        best
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get number of occupied cells in the index
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Cells on the square ring at Chebyshev distance `ring` from (cx, cy).
fn ring_cells(cx: i32, cy: i32, ring: i32) -> Vec<(i32, i32)> {
    if ring == 0 {
        return vec![(cx, cy)];
    }
    let mut cells = Vec::with_capacity((8 * ring) as usize);
    for dx in -ring..=ring {
        cells.push((cx + dx, cy - ring));
        cells.push((cx + dx, cy + ring));
    }
    for dy in (-ring + 1)..ring {
        cells.push((cx - ring, cy + dy));
        cells.push((cx + ring, cy + dy));
    }
    cells
}

/// Morton encode 2D cell coordinates into a single 64-bit integer
/// This provides spatial locality for hash lookups
fn morton_encode(x: i32, y: i32) -> u64 {
    // Reinterpret as unsigned to handle negative coordinates
    let x = u64::from(x as u32);
    let y = u64::from(y as u32);

    let mut result = 0u64;

    for i in 0..32 {
        // 32 bits per coordinate = 64 bits total
        result |= ((x & (1 << i)) << i) | ((y & (1 << i)) << (i + 1));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_finds_closest_point() {
        let index = SpatialIndex::build(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(5.0, 5.0),
                Point2::new(50.0, 50.0),
            ],
            10.0,
        );

        let found = index.nearest(&Point2::new(45.0, 47.0)).unwrap();
        assert_eq!(found.index, 2);
        assert!((found.distance - (25.0f64 + 9.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_tie_prefers_first_occurrence() {
        let index = SpatialIndex::build(
            vec![
                Point2::new(30.0, 0.0),
                Point2::new(-30.0, 0.0),
                Point2::new(0.0, 30.0),
            ],
            7.0,
        );

        let found = index.nearest(&Point2::new(0.0, 0.0)).unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.distance, 30.0);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let points: Vec<Point2<f64>> = (0..200)
            .map(|i| {
                let t = f64::from(i);
                Point2::new((t * 37.3).sin() * 400.0, (t * 11.9).cos() * 250.0)
            })
            .collect();
        let index = SpatialIndex::build(points.clone(), 25.0);

        for q in 0..50 {
            let t = f64::from(q);
            let query = Point2::new((t * 3.1).cos() * 600.0, (t * 7.7).sin() * 600.0);
            let brute = points
                .iter()
                .enumerate()
                .map(|(i, p)| (i, (p - query).norm()))
                .fold(None::<(usize, f64)>, |best, (i, d)| match best {
                    Some((_, bd)) if bd <= d => best,
                    _ => Some((i, d)),
                })
                .unwrap();
            let found = index.nearest(&query).unwrap();
            assert_eq!(found.index, brute.0);
            assert!((found.distance - brute.1).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_index_has_no_nearest() {
        let index = SpatialIndex::build(Vec::new(), 10.0);
        assert!(index.nearest(&Point2::new(0.0, 0.0)).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_morton_encoding() {
        // Morton encoding should provide spatial locality
        let code1 = morton_encode(0, 0);
        let code2 = morton_encode(1, 0);
        let code3 = morton_encode(0, 1);

        assert_ne!(code1, code2);
        assert_ne!(code1, code3);
        assert_ne!(code2, code3);
        assert_ne!(morton_encode(-1, 0), morton_encode(0, -1));
    }
}
