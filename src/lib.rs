//! Single-container loading with the weighted EB-AFIT layer heuristic.
//!
//! The engine tries every useful orientation of the container and every
//! promising first-layer thickness, keeps the best trial and replays it to
//! record placements. See [`optimizer::pack`] for the entry point.

pub mod api;
pub mod config;
pub mod geometry;
pub mod layer;
pub mod model;
pub mod optimizer;
pub mod orientation;
pub mod orlib;
pub mod ranking;
pub mod skyline;
pub mod thickness;
pub mod types;
