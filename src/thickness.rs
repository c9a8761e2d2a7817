//! Layer thickness selection.
//!
//! A thickness is one side of an item type. It is preferred when the other
//! item types have a side close to it, since they can then fill the layer
//! without wasting height.

use crate::model::ItemType;
use crate::types::Vec3;

/// An initial layer thickness together with its evaluation score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerCandidate {
    pub thickness: f64,
    /// Lower is better.
    pub score: f64,
}

/// Smallest distance between `thickness` and any side of `dims`.
fn min_axis_difference(thickness: f64, dims: (f64, f64, f64)) -> f64 {
    let (x, y, z) = dims;
    (thickness - x)
        .abs()
        .min((thickness - y).abs())
        .min((thickness - z).abs())
}

/// Checks that the footprint `(a, b)` of a layer orientation fits the layer
/// plane in either rotation.
fn cross_section_fits(orientation: Vec3, bin: Vec3, eps: f64) -> bool {
    let (a, b) = (orientation.y, orientation.z);
    (a <= bin.x + eps && b <= bin.z + eps) || (b <= bin.x + eps && a <= bin.z + eps)
}

/// Lists the distinct thicknesses worth trying as first layer of `bin`.
///
/// Returned in ascending score order; candidates with equal score keep the
/// catalog order.
pub fn candidate_layers(bin: Vec3, items: &[ItemType], eps: f64) -> Vec<LayerCandidate> {
    let mut layers: Vec<LayerCandidate> = Vec::new();

    for (index, item) in items.iter().enumerate() {
        if item.volume() <= 0.0 {
            continue;
        }
        for orientation in item.layer_orientations() {
            let thickness = orientation.x;
            if thickness > bin.y + eps || !cross_section_fits(orientation, bin, eps) {
                continue;
            }
            if layers.iter().any(|l| l.thickness == thickness) {
                continue;
            }

            let score = items
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, other)| min_axis_difference(thickness, other.dims))
                .sum();
            layers.push(LayerCandidate { thickness, score });
        }
    }

    layers.sort_by(|a, b| a.score.total_cmp(&b.score));
    layers
}

/// Chooses the thickness of the next layer.
///
/// Only item types with units left are considered and the score of every
/// other type is weighted by its remaining quantity. Returns `None` when no
/// orientation fits into the remaining height.
pub fn next_layer_thickness(
    bin: Vec3,
    remaining_y: f64,
    items: &[ItemType],
    quantities: &[u32],
    eps: f64,
) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;

    for (index, item) in items.iter().enumerate() {
        if quantities[index] == 0 || item.volume() <= 0.0 {
            continue;
        }
        for orientation in item.layer_orientations() {
            let thickness = orientation.x;
            if thickness > remaining_y + eps || !cross_section_fits(orientation, bin, eps) {
                continue;
            }

            let score: f64 = items
                .iter()
                .zip(quantities)
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, (other, &qty))| min_axis_difference(thickness, other.dims) * qty as f64)
                .sum();

            if best.is_none_or(|(best_score, _)| score < best_score) {
                best = Some((score, thickness));
            }
        }
    }

    best.map(|(_, thickness)| thickness)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn items() -> Vec<ItemType> {
        vec![
            ItemType::new("A", (2.0, 2.0, 2.0), 1, 0.0).unwrap(),
            ItemType::new("B", (3.0, 5.0, 2.0), 1, 0.0).unwrap(),
        ]
    }

    #[test]
    fn candidates_are_distinct_and_sorted_by_score() {
        let layers = candidate_layers(Vec3::new(10.0, 10.0, 10.0), &items(), EPS);
        let thicknesses: Vec<f64> = layers.iter().map(|l| l.thickness).collect();
        assert_eq!(thicknesses, vec![2.0, 3.0, 5.0]);
        let scores: Vec<f64> = layers.iter().map(|l| l.score).collect();
        assert_eq!(scores, vec![0.0, 1.0, 3.0]);
    }

    #[test]
    fn oversize_orientations_are_skipped() {
        let layers = candidate_layers(Vec3::new(4.0, 4.0, 4.0), &items(), EPS);
        let thicknesses: Vec<f64> = layers.iter().map(|l| l.thickness).collect();
        assert_eq!(thicknesses, vec![2.0]);
    }

    #[test]
    fn zero_volume_types_produce_no_layers() {
        let items = vec![ItemType::new("flat", (0.0, 2.0, 2.0), 3, 0.0).unwrap()];
        assert!(candidate_layers(Vec3::new(5.0, 5.0, 5.0), &items, EPS).is_empty());
    }

    #[test]
    fn next_layer_uses_remaining_quantities() {
        let bin = Vec3::new(10.0, 10.0, 10.0);
        let items = items();
        assert_eq!(next_layer_thickness(bin, 4.0, &items, &[1, 1], EPS), Some(2.0));
        assert_eq!(next_layer_thickness(bin, 4.0, &items, &[0, 1], EPS), Some(3.0));
        assert_eq!(next_layer_thickness(bin, 1.0, &items, &[1, 1], EPS), None);
        assert_eq!(next_layer_thickness(bin, 10.0, &items, &[0, 0], EPS), None);
    }
}
