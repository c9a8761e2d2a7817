//! Layer-by-layer packing of one container orientation.
//!
//! A run starts from an initial layer thickness and fills the oriented
//! container layer after layer. Each layer is filled through its skyline:
//! the lowest pad is offered to the ranker, the winner is placed and the
//! skyline updated, and pads nothing fits into are closed. When a taller unit
//! is accepted as filler, the strip it leaves above the original thickness is
//! packed as a layer of its own afterwards.
//!
//! The same code runs in trial mode (only volume and weight are tracked) and
//! in commit mode (placements are recorded in the original container frame).

use std::collections::HashMap;

use tracing::trace;

use crate::model::{Container, ItemType};
use crate::optimizer::PackingConfig;
use crate::orientation::ContainerOrientation;
use crate::ranking::{Candidate, GapQuery, RankingContext, Selection, enumerate_candidates, select_candidate};
use crate::skyline::{Situation, Skyline};
use crate::thickness::next_layer_thickness;
use crate::types::{Vec3, approx_eq};

/// Inputs shared by every run of one packing request.
#[derive(Clone, Debug)]
pub struct PackingProblem<'a> {
    pub container: &'a Container,
    pub items: &'a [ItemType],
    pub candidates: Vec<Candidate>,
    pub total_item_volume: f64,
    pub weighted: bool,
    pub dim_factor: f64,
    pub epsilon: f64,
}

impl<'a> PackingProblem<'a> {
    pub fn new(container: &'a Container, items: &'a [ItemType], config: &PackingConfig) -> Self {
        let total_item_volume = items
            .iter()
            .map(|item| item.volume() * item.quantity as f64)
            .sum();
        Self {
            container,
            items,
            candidates: enumerate_candidates(items),
            total_item_volume,
            weighted: config.weighted,
            dim_factor: config.dim_factor,
            epsilon: config.epsilon,
        }
    }

    /// Quantities as supplied by the catalog.
    pub fn initial_quantities(&self) -> Vec<u32> {
        self.items.iter().map(|item| item.quantity).collect()
    }

    /// Rounded container volume divided by the dimensional factor.
    pub fn dimensional_weight(&self) -> f64 {
        self.container.dims_as_vec3().rounded().volume() / self.dim_factor
    }
}

/// Whether a run records placements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Trial,
    Commit,
}

/// A unit placed during a commit run, in the original container frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Index into the catalog.
    pub item: usize,
    pub position: Vec3,
    pub packed_dims: Vec3,
}

/// Summary of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    pub packed_volume: f64,
    pub packed_weight: f64,
    /// Everything that could possibly be packed has been packed.
    pub full: bool,
    /// Empty in trial mode.
    pub placements: Vec<Placement>,
    /// Units left per catalog entry.
    pub remaining: Vec<u32>,
}

/// Mutable state of one run.
pub struct LayerBuilder<'a> {
    problem: &'a PackingProblem<'a>,
    orientation: ContainerOrientation,
    mode: RunMode,
    bin: Vec3,
    dimensional_weight: f64,
    quantities: Vec<u32>,
    packed_counts: HashMap<&'a str, u32>,
    placements: Vec<Placement>,
    volume: f64,
    weight: f64,
    thickness: f64,
    remaining_y: f64,
    remaining_z: f64,
    packed_y: f64,
    layer_in_layer: f64,
    previous_thickness: f64,
    lil_z: f64,
    done: bool,
}

impl<'a> LayerBuilder<'a> {
    pub fn new(problem: &'a PackingProblem<'a>, orientation: ContainerOrientation, mode: RunMode) -> Self {
        let bin = orientation.to_local(problem.container.dims_as_vec3());
        Self {
            problem,
            orientation,
            mode,
            bin,
            dimensional_weight: problem.dimensional_weight(),
            quantities: problem.initial_quantities(),
            packed_counts: HashMap::new(),
            placements: Vec::new(),
            volume: 0.0,
            weight: 0.0,
            thickness: 0.0,
            remaining_y: bin.y,
            remaining_z: bin.z,
            packed_y: 0.0,
            layer_in_layer: 0.0,
            previous_thickness: 0.0,
            lil_z: 0.0,
            done: false,
        }
    }

    /// Packs the oriented container starting with a layer of `initial_thickness`.
    pub fn run(mut self, initial_thickness: f64) -> RunOutcome {
        let eps = self.problem.epsilon;
        self.thickness = initial_thickness;

        while !self.done {
            self.layer_in_layer = 0.0;
            self.pack_layer();

            self.packed_y += self.thickness;
            self.remaining_y = self.bin.y - self.packed_y;

            if self.layer_in_layer > eps && !self.done {
                let packed_y = self.packed_y;
                let remaining_y = self.remaining_y;

                self.remaining_y = self.thickness - self.previous_thickness;
                self.packed_y = self.packed_y - self.thickness + self.previous_thickness;
                self.remaining_z = self.lil_z;
                self.thickness = self.layer_in_layer;
                trace!(
                    thickness = self.thickness,
                    depth = self.remaining_z,
                    "packing strip left by filler"
                );
                self.pack_layer();

                self.packed_y = packed_y;
                self.remaining_y = remaining_y;
                self.remaining_z = self.bin.z;
            }

            if !self.done {
                self.select_next_thickness();
            }
        }

        RunOutcome {
            packed_volume: self.volume,
            packed_weight: self.weight,
            full: self.is_full(),
            placements: self.placements,
            remaining: self.quantities,
        }
    }

    fn select_next_thickness(&mut self) {
        let eps = self.problem.epsilon;
        match next_layer_thickness(
            self.bin,
            self.remaining_y,
            self.problem.items,
            &self.quantities,
            eps,
        ) {
            Some(thickness) if thickness > eps && thickness <= self.remaining_y + eps => {
                self.thickness = thickness;
            }
            _ => {
                self.thickness = 0.0;
                self.done = true;
            }
        }
    }

    fn pack_layer(&mut self) {
        let eps = self.problem.epsilon;
        if self.thickness <= eps {
            self.done = true;
            return;
        }

        let mut skyline = Skyline::new(self.bin.x, eps);
        loop {
            let index = skyline.lowest();
            let pad = skyline.pad(index);
            let gap = skyline.gap(index, self.remaining_z);
            let situation = skyline.situation(index);
            let query = GapQuery {
                space: Vec3::new(gap.width, self.remaining_y, gap.depth),
                depth_reference: gap.depth_reference,
                weight_headroom: self.problem.container.max_weight - self.weight,
            };

            let chosen = match self.select(&query) {
                Selection::Fits(candidate) => Some(candidate),
                Selection::Exceeds(candidate)
                    if self.layer_in_layer > eps || situation == Situation::Open =>
                {
                    let height = self.problem.candidates[candidate].dims.y;
                    if self.layer_in_layer <= eps {
                        self.previous_thickness = self.thickness;
                        self.lil_z = pad.cum_z;
                    }
                    self.layer_in_layer += height - self.thickness;
                    self.thickness = height;
                    Some(candidate)
                }
                _ => None,
            };

            match chosen {
                Some(candidate) => {
                    let dims = self.problem.candidates[candidate].dims;
                    let x = skyline.place(index, dims.x, dims.z);
                    self.record(candidate, Vec3::new(x, self.packed_y, pad.cum_z));
                }
                None => {
                    if !skyline.close(index) {
                        break;
                    }
                }
            }
        }
    }

    fn select(&self, query: &GapQuery) -> Selection {
        let ctx = RankingContext {
            items: self.problem.items,
            quantities: &self.quantities,
            packed_counts: &self.packed_counts,
            thickness: self.thickness,
            packed_weight: self.weight,
            dimensional_weight: self.dimensional_weight,
            weighted: self.problem.weighted,
            epsilon: self.problem.epsilon,
        };
        select_candidate(&self.problem.candidates, query, &ctx)
    }

    fn record(&mut self, candidate: usize, local_position: Vec3) {
        let problem = self.problem;
        let eps = problem.epsilon;
        let candidate = problem.candidates[candidate];
        let item = &problem.items[candidate.item];

        self.quantities[candidate.item] -= 1;
        // Counted in trial runs as well: trial and commit must rank identically.
        *self.packed_counts.entry(item.id.as_str()).or_insert(0) += 1;
        self.volume += candidate.dims.volume();
        self.weight += item.weight;

        let max_weight = problem.container.max_weight;
        if self.is_full()
            || (problem.weighted && max_weight > 0.0 && approx_eq(self.weight, max_weight, eps))
        {
            self.done = true;
        }

        if self.mode == RunMode::Commit {
            self.placements.push(Placement {
                item: candidate.item,
                position: self.orientation.to_original(local_position),
                packed_dims: self.orientation.to_original(candidate.dims),
            });
        }
    }

    fn is_full(&self) -> bool {
        let eps = self.problem.epsilon;
        self.volume > 0.0
            && (approx_eq(self.volume, self.problem.container.volume(), eps)
                || approx_eq(self.volume, self.problem.total_item_volume, eps))
    }
}
