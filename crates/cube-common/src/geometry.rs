//! Minimal vector geometry types.
//!
//! The cube engine only needs enough geometry support to derive footprints,
//! reproject coordinates and rasterize features onto the reference frame.
//! Anything fancier (simplification, buffering, topology) belongs to the
//! upstream data producer.

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, CrsCode};

/// A polygon ring: a closed sequence of (x, y) vertices.
///
/// The ring does not need to repeat its first vertex; closure is implicit.
pub type Ring = Vec<(f64, f64)>;

/// Vector geometry in a single CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point { x: f64, y: f64 },
    MultiPoint(Vec<(f64, f64)>),
    Polygon { exterior: Ring, holes: Vec<Ring> },
    MultiPolygon(Vec<(Ring, Vec<Ring>)>),
}

impl Geometry {
    /// Compute the bounding box of this geometry.
    ///
    /// Returns `None` for geometries with no vertices.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut acc: Option<BoundingBox> = None;
        self.for_each_vertex(|x, y| {
            let point = BoundingBox::new(x, y, x, y);
            acc = Some(match acc {
                Some(b) => b.union(&point),
                None => point,
            });
        });
        acc
    }

    /// Reproject every vertex from `src` into `dst`.
    pub fn transform(&self, src: CrsCode, dst: CrsCode) -> Geometry {
        let tx = |&(x, y): &(f64, f64)| src.transform_point(dst, x, y);
        match self {
            Geometry::Point { x, y } => {
                let (x, y) = src.transform_point(dst, *x, *y);
                Geometry::Point { x, y }
            }
            Geometry::MultiPoint(points) => Geometry::MultiPoint(points.iter().map(tx).collect()),
            Geometry::Polygon { exterior, holes } => Geometry::Polygon {
                exterior: exterior.iter().map(tx).collect(),
                holes: holes
                    .iter()
                    .map(|ring| ring.iter().map(tx).collect())
                    .collect(),
            },
            Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(
                polys
                    .iter()
                    .map(|(exterior, holes)| {
                        (
                            exterior.iter().map(tx).collect(),
                            holes
                                .iter()
                                .map(|ring| ring.iter().map(tx).collect())
                                .collect(),
                        )
                    })
                    .collect(),
            ),
        }
    }

    /// Test whether a point lies inside this geometry.
    ///
    /// Polygons use the even-odd rule, so holes are excluded. Point and
    /// multi-point geometries never contain a query point (they have no
    /// area); the rasterizer burns them by direct cell assignment instead.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        match self {
            Geometry::Point { .. } | Geometry::MultiPoint(_) => false,
            Geometry::Polygon { exterior, holes } => {
                ring_contains(exterior, x, y)
                    && !holes.iter().any(|hole| ring_contains(hole, x, y))
            }
            Geometry::MultiPolygon(polys) => polys.iter().any(|(exterior, holes)| {
                ring_contains(exterior, x, y)
                    && !holes.iter().any(|hole| ring_contains(hole, x, y))
            }),
        }
    }

    fn for_each_vertex(&self, mut f: impl FnMut(f64, f64)) {
        match self {
            Geometry::Point { x, y } => f(*x, *y),
            Geometry::MultiPoint(points) => points.iter().for_each(|&(x, y)| f(x, y)),
            Geometry::Polygon { exterior, holes } => {
                exterior.iter().for_each(|&(x, y)| f(x, y));
                holes
                    .iter()
                    .for_each(|ring| ring.iter().for_each(|&(x, y)| f(x, y)));
            }
            Geometry::MultiPolygon(polys) => polys.iter().for_each(|(exterior, holes)| {
                exterior.iter().for_each(|&(x, y)| f(x, y));
                holes
                    .iter()
                    .for_each(|ring| ring.iter().for_each(|&(x, y)| f(x, y)));
            }),
        }
    }
}

/// Even-odd ray casting test against a single ring.
fn ring_contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) {
            let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Geometry {
        Geometry::Polygon {
            exterior: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            holes: vec![],
        }
    }

    #[test]
    fn test_polygon_bbox() {
        let bbox = unit_square().bbox().unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_point_in_polygon() {
        let poly = unit_square();
        assert!(poly.contains_point(5.0, 5.0));
        assert!(!poly.contains_point(15.0, 5.0));
        assert!(!poly.contains_point(5.0, -1.0));
    }

    #[test]
    fn test_hole_excluded() {
        let poly = Geometry::Polygon {
            exterior: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            holes: vec![vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]],
        };
        assert!(poly.contains_point(2.0, 2.0));
        assert!(!poly.contains_point(5.0, 5.0));
    }

    #[test]
    fn test_multipolygon_contains() {
        let poly = Geometry::MultiPolygon(vec![
            (vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)], vec![]),
            (vec![(5.0, 5.0), (7.0, 5.0), (7.0, 7.0), (5.0, 7.0)], vec![]),
        ]);
        assert!(poly.contains_point(1.0, 1.0));
        assert!(poly.contains_point(6.0, 6.0));
        assert!(!poly.contains_point(3.5, 3.5));
    }

    #[test]
    fn test_point_geometry_has_no_area() {
        let point = Geometry::Point { x: 1.0, y: 1.0 };
        assert!(!point.contains_point(1.0, 1.0));
        assert_eq!(point.bbox().unwrap(), BoundingBox::new(1.0, 1.0, 1.0, 1.0));
    }
}
