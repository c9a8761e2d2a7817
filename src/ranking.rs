//! Candidate ranking for a single gap of the skyline.
//!
//! Every (item type, orientation) pair is a candidate. For a gap the
//! candidates are filtered by quantity, fit and weight, split into those that
//! fit the current layer thickness and those that are taller, and ranked with
//! a lexicographic comparator. Ties keep enumeration order.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::ItemType;
use crate::types::{Vec3, compare_with_epsilon};

/// An item type paired with one of its orientations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Index into the catalog.
    pub item: usize,
    /// Orientation as it would be packed, in the local frame.
    pub dims: Vec3,
}

/// Lists every orientation of every item type, in catalog order.
pub fn enumerate_candidates(items: &[ItemType]) -> Vec<Candidate> {
    items
        .iter()
        .enumerate()
        .flat_map(|(item, it)| {
            it.orientations()
                .into_iter()
                .map(move |dims| Candidate { item, dims })
        })
        .collect()
}

/// The open space at the lowest pad of the skyline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GapQuery {
    /// Width, height and depth available.
    pub space: Vec3,
    /// Depth already consumed by the neighbouring run; used for depth alignment.
    pub depth_reference: f64,
    /// Weight that may still be added to the container.
    pub weight_headroom: f64,
}

/// Layer state the ranking depends on.
#[derive(Clone, Copy, Debug)]
pub struct RankingContext<'a> {
    pub items: &'a [ItemType],
    pub quantities: &'a [u32],
    pub packed_counts: &'a HashMap<&'a str, u32>,
    pub thickness: f64,
    pub packed_weight: f64,
    pub dimensional_weight: f64,
    pub weighted: bool,
    pub epsilon: f64,
}

/// Outcome of ranking the candidates for a gap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Best candidate no taller than the layer thickness.
    Fits(usize),
    /// No candidate fits the thickness; best of the taller ones.
    Exceeds(usize),
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Partition {
    Fits,
    Exceeds,
}

impl RankingContext<'_> {
    fn is_eligible(&self, candidate: &Candidate, gap: &GapQuery) -> bool {
        let item = &self.items[candidate.item];
        self.quantities[candidate.item] > 0
            && candidate.dims.is_valid_dimension()
            && candidate.dims.fits_within(&gap.space, self.epsilon)
            && (!self.weighted || item.weight <= gap.weight_headroom + self.epsilon)
    }

    fn partition(&self, candidate: &Candidate) -> Partition {
        if candidate.dims.y <= self.thickness + self.epsilon {
            Partition::Fits
        } else {
            Partition::Exceeds
        }
    }

    fn packed_count(&self, candidate: &Candidate) -> u32 {
        let id = self.items[candidate.item].id.as_str();
        self.packed_counts.get(id).copied().unwrap_or(0)
    }

    fn compare(&self, partition: Partition, gap: &GapQuery, a: &Candidate, b: &Candidate) -> Ordering {
        let eps = self.epsilon;

        if self.weighted {
            let weight_a = self.items[a.item].weight;
            let weight_b = self.items[b.item].weight;

            // Both would overshoot the dimensional weight: spread load across types.
            let over_a = weight_a + self.packed_weight > self.dimensional_weight;
            let over_b = weight_b + self.packed_weight > self.dimensional_weight;
            if over_a && over_b {
                let order = self.packed_count(a).cmp(&self.packed_count(b));
                if order != Ordering::Equal {
                    return order;
                }
            }

            let order = compare_with_epsilon(
                weight_a + self.packed_weight - self.dimensional_weight,
                weight_b + self.packed_weight - self.dimensional_weight,
                eps,
            );
            if order != Ordering::Equal {
                return order;
            }
        }

        let (height_a, height_b) = match partition {
            Partition::Fits => (self.thickness - a.dims.y, self.thickness - b.dims.y),
            Partition::Exceeds => (a.dims.y - self.thickness, b.dims.y - self.thickness),
        };

        compare_with_epsilon(height_a, height_b, eps)
            .then_with(|| {
                compare_with_epsilon(gap.space.x - a.dims.x, gap.space.x - b.dims.x, eps)
            })
            .then_with(|| {
                compare_with_epsilon(
                    (gap.depth_reference - a.dims.z).abs(),
                    (gap.depth_reference - b.dims.z).abs(),
                    eps,
                )
            })
    }

    fn best_in(&self, partition: Partition, candidates: &[Candidate], gap: &GapQuery) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| self.is_eligible(c, gap) && self.partition(c) == partition)
            .min_by(|(_, a), (_, b)| self.compare(partition, gap, a, b))
            .map(|(index, _)| index)
    }
}

/// Picks the best candidate for a gap.
///
/// Candidates that fit the current thickness always win; a taller candidate is
/// only reported when none of them qualifies.
pub fn select_candidate(candidates: &[Candidate], gap: &GapQuery, ctx: &RankingContext<'_>) -> Selection {
    if let Some(index) = ctx.best_in(Partition::Fits, candidates, gap) {
        return Selection::Fits(index);
    }
    match ctx.best_in(Partition::Exceeds, candidates, gap) {
        Some(index) => Selection::Exceeds(index),
        None => Selection::None,
    }
}
