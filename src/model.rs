//! Data models for the container loading engine.
//!
//! This module defines the fundamental data structures:
//! - `ItemType`: a catalog entry with dimensions, quantity and unit weight
//! - `Container`: the single container being loaded, with its weight limit
//! - `PackedItem`: one unit of an item type with its final position and orientation
//!
//! Dimensions are exposed as `(x, y, z)` tuples for the API and converted to
//! `Vec3` for the geometry code.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{BoundingBox, Vec3};

/// Validation error for catalog and container data.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Item dimensions may be zero (such items are never packed) but never negative.
fn validate_item_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be a non-negative number, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_container_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be a non-negative number, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::InvalidIdentifier(
            "id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// An item type in the catalog.
///
/// `quantity` is the number of identical units available. The engine never
/// mutates the caller's catalog; it works on per-trial quantity snapshots.
///
/// # Fields
/// * `id` - Stable identifier, also used as the key for fairness counting
/// * `dims` - Dimensions as supplied (x, y, z)
/// * `quantity` - Available units
/// * `weight` - Weight of a single unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemType {
    pub id: String,
    #[schema(value_type = [f64; 3], example = json!([30.0, 40.0, 20.0]))]
    pub dims: (f64, f64, f64),
    pub quantity: u32,
    pub weight: f64,
}

impl ItemType {
    /// Creates a new item type with validation.
    ///
    /// # Examples
    /// ```
    /// use afit_packer::model::ItemType;
    ///
    /// assert!(ItemType::new("A", (10.0, 20.0, 30.0), 4, 5.0).is_ok());
    /// assert!(ItemType::new("A", (-10.0, 20.0, 30.0), 4, 5.0).is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        dims: (f64, f64, f64),
        quantity: u32,
        weight: f64,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        validate_id(&id)?;
        validate_item_dimension(dims.0, "Item x")?;
        validate_item_dimension(dims.1, "Item y")?;
        validate_item_dimension(dims.2, "Item z")?;
        validate_weight_value(weight, "Item weight")?;
        Ok(Self {
            id,
            dims,
            quantity,
            weight,
        })
    }

    /// Volume of a single unit.
    pub fn volume(&self) -> f64 {
        let (x, y, z) = self.dims;
        x * y * z
    }

    /// Converts the dimensions to a Vec3.
    #[inline]
    pub fn dims_as_vec3(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }

    /// The six axis permutations of the dimensions.
    ///
    /// Order: (x,y,z), (x,z,y), (y,x,z), (y,z,x), (z,x,y), (z,y,x).
    /// Items with equal axes yield repeated entries; they are kept.
    pub fn orientations(&self) -> [Vec3; 6] {
        let (x, y, z) = self.dims;
        [
            Vec3::new(x, y, z),
            Vec3::new(x, z, y),
            Vec3::new(y, x, z),
            Vec3::new(y, z, x),
            Vec3::new(z, x, y),
            Vec3::new(z, y, x),
        ]
    }

    /// The three orientations used when choosing a layer thickness.
    ///
    /// The x component of each entry is the candidate thickness.
    pub fn layer_orientations(&self) -> [Vec3; 3] {
        let (x, y, z) = self.dims;
        [Vec3::new(x, y, z), Vec3::new(y, x, z), Vec3::new(z, x, y)]
    }

    /// Copy of this type describing a single unit.
    pub fn single_unit(&self) -> Self {
        Self {
            quantity: 1,
            ..self.clone()
        }
    }
}

/// The container being loaded.
///
/// # Fields
/// * `id` - Identifier reported back in the result
/// * `dims` - Dimensions (x, y, z)
/// * `max_weight` - Maximum total weight of packed units
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Container {
    pub id: String,
    #[schema(value_type = [f64; 3], example = json!([120.0, 100.0, 80.0]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
}

impl Container {
    /// Creates a new container with validation.
    ///
    /// # Returns
    /// `Ok(Container)` for valid values, otherwise `Err(ValidationError)`
    pub fn new(
        id: impl Into<String>,
        dims: (f64, f64, f64),
        max_weight: f64,
    ) -> Result<Self, ValidationError> {
        validate_container_dimension(dims.0, "Container x")?;
        validate_container_dimension(dims.1, "Container y")?;
        validate_container_dimension(dims.2, "Container z")?;
        validate_weight_value(max_weight, "Maximum weight")?;
        Ok(Self {
            id: id.into(),
            dims,
            max_weight,
        })
    }

    /// Calculates the total volume of the container.
    pub fn volume(&self) -> f64 {
        let (x, y, z) = self.dims;
        x * y * z
    }

    /// Converts the container dimensions to a Vec3.
    #[inline]
    pub fn dims_as_vec3(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }

    /// Bounding box of the container interior, anchored at the origin.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(Vec3::zero(), self.dims_as_vec3())
    }
}

/// A packed unit with its final placement in the container's own axes.
///
/// # Fields
/// * `id` - Item type identifier
/// * `dims` - Original dimensions of the item type
/// * `weight` - Unit weight
/// * `position` - Packed corner (x, y, z)
/// * `packed_dims` - Extent along (x, y, z) as packed, i.e. the chosen orientation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackedItem {
    pub id: String,
    #[schema(value_type = [f64; 3], example = json!([30.0, 40.0, 20.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub position: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([40.0, 20.0, 30.0]))]
    pub packed_dims: (f64, f64, f64),
}

impl PackedItem {
    /// Volume of the unit.
    pub fn volume(&self) -> f64 {
        let (x, y, z) = self.packed_dims;
        x * y * z
    }

    /// Calculates the bounding box of the packed unit.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(
            Vec3::from_tuple(self.position),
            Vec3::from_tuple(self.packed_dims),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_orientations_are_all_permutations() {
        let item = ItemType::new("A", (1.0, 2.0, 3.0), 1, 0.0).unwrap();
        let orientations = item.orientations();
        assert_eq!(orientations[0], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(orientations[5], Vec3::new(3.0, 2.0, 1.0));
        for dims in orientations {
            assert!((dims.volume() - 6.0).abs() < 1e-9);
        }

        let thicknesses: Vec<f64> = item.layer_orientations().iter().map(|d| d.x).collect();
        assert_eq!(thicknesses, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn cube_item_repeats_orientations() {
        let item = ItemType::new("C", (2.0, 2.0, 2.0), 1, 0.0).unwrap();
        assert!(item.orientations().iter().all(|o| *o == Vec3::new(2.0, 2.0, 2.0)));
    }

    #[test]
    fn item_validation() {
        assert!(ItemType::new("A", (0.0, 1.0, 1.0), 1, 0.0).is_ok());
        assert!(matches!(
            ItemType::new("A", (1.0, f64::NAN, 1.0), 1, 0.0),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            ItemType::new("A", (1.0, 1.0, 1.0), 1, -2.0),
            Err(ValidationError::InvalidWeight(_))
        ));
        assert!(matches!(
            ItemType::new("  ", (1.0, 1.0, 1.0), 1, 0.0),
            Err(ValidationError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn container_validation() {
        assert!(Container::new("box", (10.0, 10.0, 10.0), 0.0).is_ok());
        assert!(Container::new("box", (0.0, 10.0, 10.0), 10.0).is_err());
        assert!(Container::new("box", (10.0, 10.0, 10.0), f64::INFINITY).is_err());
        let container = Container::new("box", (2.0, 3.0, 4.0), 10.0).unwrap();
        assert!((container.volume() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn single_unit_keeps_dimensions_and_weight() {
        let item = ItemType::new("A", (1.0, 2.0, 3.0), 7, 2.5).unwrap();
        let unit = item.single_unit();
        assert_eq!(unit.quantity, 1);
        assert_eq!(unit.dims, item.dims);
        assert_eq!(unit.weight, 2.5);
    }

    #[test]
    fn packed_item_bounding_box_uses_packed_dims() {
        let packed = PackedItem {
            id: "A".to_string(),
            dims: (1.0, 2.0, 3.0),
            weight: 1.0,
            position: (1.0, 1.0, 1.0),
            packed_dims: (3.0, 1.0, 2.0),
        };
        let bbox = packed.bounding_box();
        assert_eq!(bbox.max, Vec3::new(4.0, 2.0, 3.0));
        assert!((packed.volume() - 6.0).abs() < 1e-9);
    }
}
