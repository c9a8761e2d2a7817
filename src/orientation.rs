//! Container orientations tried by the optimizer.
//!
//! Each orientation relabels the container's axes. Packing happens in the
//! relabelled (local) frame; coordinates and packed dimensions are mapped
//! back through the same table so every result is reported in the caller's
//! original frame.

use crate::types::Vec3;

/// Local axis `i` is taken from original axis `PERMUTATIONS[o][i]`.
///
/// The order is the evaluation order of the optimizer; the identity
/// permutation is not first.
const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 2, 1],
    [1, 2, 0],
    [1, 0, 2],
    [2, 0, 1],
    [0, 1, 2],
    [2, 1, 0],
];

const IDENTITY_INDEX: usize = 4;

/// One of the six axis permutations of the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerOrientation {
    index: usize,
}

impl ContainerOrientation {
    /// Returns the orientation with the given table index, if it exists.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < PERMUTATIONS.len()).then_some(Self { index })
    }

    /// The identity permutation.
    pub fn identity() -> Self {
        Self {
            index: IDENTITY_INDEX,
        }
    }

    /// Orientations worth evaluating for a container.
    ///
    /// A cube is the same in every orientation, so only the identity is returned.
    pub fn candidates_for(dims: Vec3) -> Vec<Self> {
        if dims.is_cube() {
            vec![Self::identity()]
        } else {
            (0..PERMUTATIONS.len()).map(|index| Self { index }).collect()
        }
    }

    /// Table index of this orientation.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Maps a vector from the original frame into the local frame.
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        let axes = v.axes();
        let perm = PERMUTATIONS[self.index];
        Vec3::new(axes[perm[0]], axes[perm[1]], axes[perm[2]])
    }

    /// Maps a vector from the local frame back into the original frame.
    pub fn to_original(&self, v: Vec3) -> Vec3 {
        let local = v.axes();
        let perm = PERMUTATIONS[self.index];
        let mut original = [0.0; 3];
        for (axis, &source) in perm.iter().enumerate() {
            original[source] = local[axis];
        }
        Vec3::from_axes(original)
    }
}
