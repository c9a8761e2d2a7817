//! Geometry value types.
//!
//! `Vec3` serves both as a size (item, gap or container extents) and as a
//! corner coordinate. `BoundingBox` is only used to verify finished
//! placements. All float comparisons go through an explicit tolerance.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Extents or coordinates along x (width), y (layer axis) and z (depth).
///
/// # Examples
/// ```
/// use afit_packer::types::Vec3;
///
/// let gap = Vec3::new(10.0, 4.0, 10.0);
/// let item = Vec3::new(10.0, 2.0, 6.0);
/// assert!(item.fits(&gap));
/// assert_eq!(item.volume(), 120.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Tuple form used by the model and the API.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    #[inline]
    pub const fn from_tuple((x, y, z): (f64, f64, f64)) -> Self {
        Self::new(x, y, z)
    }

    /// Builds a vector from values indexed by axis (0 = x, 1 = y, 2 = z).
    #[inline]
    pub const fn from_axes([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }

    #[inline]
    pub const fn axes(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Every axis rounded to the nearest whole unit.
    #[inline]
    pub fn rounded(&self) -> Self {
        Self::new(self.x.round(), self.y.round(), self.z.round())
    }

    #[inline]
    pub fn is_cube(&self) -> bool {
        self.x == self.y && self.y == self.z
    }

    /// True when the extents describe a box with non-zero, finite volume.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        self.axes().iter().all(|v| v.is_finite() && *v > 0.0)
    }

    /// No axis exceeds the corresponding axis of `outer`.
    #[inline]
    pub fn fits(&self, outer: &Self) -> bool {
        self.fits_within(outer, 0.0)
    }

    /// Like [`Vec3::fits`], allowing each axis to overshoot by `tolerance`.
    #[inline]
    pub fn fits_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.axes()
            .iter()
            .zip(outer.axes())
            .all(|(inner, outer)| *inner <= outer + tolerance)
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// Axis-aligned box spanned by a packed unit or the container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Boxes intersect when they share interior volume on every axis.
    /// Touching faces do not count.
    pub fn intersects(&self, other: &Self, tolerance: f64) -> bool {
        let (a_min, a_max) = (self.min.axes(), self.max.axes());
        let (b_min, b_max) = (other.min.axes(), other.max.axes());
        (0..3).all(|axis| {
            a_max[axis] > b_min[axis] + tolerance && b_max[axis] > a_min[axis] + tolerance
        })
    }

    /// `other` lies completely inside `self`.
    pub fn contains(&self, other: &Self, tolerance: f64) -> bool {
        other.max.fits_within(&self.max, tolerance) && self.min.fits_within(&other.min, tolerance)
    }
}

/// Orders `a` and `b`, treating values within `eps` of each other as equal.
pub fn compare_with_epsilon(a: f64, b: f64, eps: f64) -> Ordering {
    if approx_eq(a, b, eps) {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[inline]
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn axis_conversions() {
        let v = Vec3::new(3.0, 1.0, 2.0);
        assert_eq!(Vec3::from_axes(v.axes()), v);
        assert_eq!(Vec3::from_tuple(v.as_tuple()), v);
        assert_eq!(v + Vec3::new(1.0, 1.0, 1.0), Vec3::new(4.0, 2.0, 3.0));
        assert_eq!(v.to_string(), "(3,1,2)");
    }

    #[test]
    fn volume_and_rounding() {
        assert_eq!(Vec3::new(2.0, 3.0, 4.0).volume(), 24.0);
        assert_eq!(Vec3::new(9.6, 2.4, 3.5).rounded(), Vec3::new(10.0, 2.0, 4.0));
    }

    #[test]
    fn fit_checks() {
        let gap = Vec3::new(4.0, 4.0, 4.0);
        assert!(Vec3::new(4.0, 1.0, 2.0).fits(&gap));
        assert!(!Vec3::new(4.0 + 1e-9, 1.0, 2.0).fits(&gap));
        assert!(Vec3::new(4.0 + 1e-9, 1.0, 2.0).fits_within(&gap, EPS));
        assert!(!Vec3::new(1.0, 5.0, 1.0).fits_within(&gap, EPS));
    }

    #[test]
    fn cube_and_validity() {
        assert!(Vec3::new(3.0, 3.0, 3.0).is_cube());
        assert!(!Vec3::new(3.0, 3.0, 4.0).is_cube());
        assert!(Vec3::new(1.0, 2.0, 3.0).is_valid_dimension());
        assert!(!Vec3::new(0.0, 1.0, 1.0).is_valid_dimension());
        assert!(!Vec3::new(f64::INFINITY, 1.0, 1.0).is_valid_dimension());
        assert!(!Vec3::new(f64::NAN, 1.0, 1.0).is_valid_dimension());
    }

    #[test]
    fn box_overlap_ignores_shared_faces() {
        let unit = Vec3::new(2.0, 2.0, 2.0);
        let a = BoundingBox::from_position_and_dims(Vec3::zero(), unit);
        let beside = BoundingBox::from_position_and_dims(Vec3::new(2.0, 0.0, 0.0), unit);
        let above = BoundingBox::from_position_and_dims(Vec3::new(0.0, 2.0, 0.0), unit);
        let inside = BoundingBox::from_position_and_dims(Vec3::new(1.0, 1.0, 1.0), unit);

        assert!(!a.intersects(&beside, EPS));
        assert!(!a.intersects(&above, EPS));
        assert!(a.intersects(&inside, EPS));
        assert!(inside.intersects(&a, EPS));
    }

    #[test]
    fn box_containment() {
        let outer = BoundingBox::from_position_and_dims(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let flush = BoundingBox::from_position_and_dims(Vec3::new(6.0, 0.0, 0.0), Vec3::new(4.0, 10.0, 1.0));
        let poking = BoundingBox::from_position_and_dims(Vec3::new(7.0, 0.0, 0.0), Vec3::new(4.0, 1.0, 1.0));

        assert!(outer.contains(&flush, EPS));
        assert!(!outer.contains(&poking, EPS));
    }

    #[test]
    fn tolerant_comparison() {
        assert_eq!(compare_with_epsilon(1.0, 1.0 + 1e-9, EPS), Ordering::Equal);
        assert_eq!(compare_with_epsilon(1.0, 2.0, EPS), Ordering::Less);
        assert_eq!(compare_with_epsilon(2.0, 1.0, EPS), Ordering::Greater);
        assert!(approx_eq(0.1 + 0.2, 0.3, EPS));
    }
}
