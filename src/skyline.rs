//! Skyline of a single layer.
//!
//! The layer's footprint is the oriented container's x-z plane. The skyline
//! records, for consecutive runs along x, how much depth (z) is already used.
//! Runs are stored as pads sorted by their right edge; the last pad always
//! ends at the container width.

use crate::types::approx_eq;

/// One run of the skyline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pad {
    /// Right edge of the run.
    pub cum_x: f64,
    /// Depth consumed over the run.
    pub cum_z: f64,
}

/// Neighbourhood of the lowest pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Situation {
    /// The only pad of the layer.
    Open,
    /// Leftmost pad with a neighbour on the right.
    NoLeft,
    /// Rightmost pad with a neighbour on the left.
    NoRight,
    /// Neighbours on both sides at the same depth.
    EvenNotch,
    /// Neighbours on both sides at different depths.
    UnevenNotch,
}

/// Free space in front of a pad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gap {
    pub width: f64,
    pub depth: f64,
    /// Depth of the neighbouring run relative to the pad.
    pub depth_reference: f64,
}

/// Ordered pad list of one layer.
#[derive(Clone, Debug)]
pub struct Skyline {
    pads: Vec<Pad>,
    width: f64,
    epsilon: f64,
}

impl Skyline {
    /// Creates an empty skyline: one pad spanning the whole width at depth zero.
    pub fn new(width: f64, epsilon: f64) -> Self {
        Self {
            pads: vec![Pad {
                cum_x: width,
                cum_z: 0.0,
            }],
            width,
            epsilon,
        }
    }

    pub fn pads(&self) -> &[Pad] {
        &self.pads
    }

    /// Index of the pad with the smallest depth; the leftmost one on ties.
    pub fn lowest(&self) -> usize {
        let mut lowest = 0;
        for (index, pad) in self.pads.iter().enumerate().skip(1) {
            if pad.cum_z < self.pads[lowest].cum_z {
                lowest = index;
            }
        }
        lowest
    }

    pub fn pad(&self, index: usize) -> Pad {
        self.pads[index]
    }

    pub fn situation(&self, index: usize) -> Situation {
        let has_left = index > 0;
        let has_right = index + 1 < self.pads.len();
        match (has_left, has_right) {
            (false, false) => Situation::Open,
            (false, true) => Situation::NoLeft,
            (true, false) => Situation::NoRight,
            (true, true) => {
                if approx_eq(
                    self.pads[index - 1].cum_z,
                    self.pads[index + 1].cum_z,
                    self.epsilon,
                ) {
                    Situation::EvenNotch
                } else {
                    Situation::UnevenNotch
                }
            }
        }
    }

    /// Left edge of the pad.
    fn left_edge(&self, index: usize) -> f64 {
        if index == 0 {
            0.0
        } else {
            self.pads[index - 1].cum_x
        }
    }

    /// Space available in front of a pad, given the depth left in the layer.
    pub fn gap(&self, index: usize, remaining_z: f64) -> Gap {
        let pad = self.pads[index];
        let depth = remaining_z - pad.cum_z;
        let depth_reference = match self.situation(index) {
            Situation::Open => depth,
            Situation::NoLeft => self.pads[index + 1].cum_z - pad.cum_z,
            _ => self.pads[index - 1].cum_z - pad.cum_z,
        };
        Gap {
            width: pad.cum_x - self.left_edge(index),
            depth,
            depth_reference,
        }
    }

    /// Places a unit of width `w` and depth `d` in front of pad `index`.
    ///
    /// Returns the x coordinate of the unit. Adjacent runs that end up at the
    /// same depth are merged.
    pub fn place(&mut self, index: usize, w: f64, d: f64) -> f64 {
        let eps = self.epsilon;
        let pad = self.pads[index];
        let left = self.left_edge(index);
        let full = approx_eq(w, pad.cum_x - left, eps);
        let top = pad.cum_z + d;

        match self.situation(index) {
            Situation::Open => {
                if full {
                    self.pads[index].cum_z = top;
                } else {
                    self.pads.insert(index + 1, pad);
                    self.pads[index] = Pad { cum_x: w, cum_z: top };
                }
                0.0
            }
            Situation::NoLeft => {
                let next = self.pads[index + 1];
                let meets_next = approx_eq(top, next.cum_z, eps);
                if full {
                    if meets_next {
                        self.pads[index] = next;
                        self.pads.remove(index + 1);
                    } else {
                        self.pads[index].cum_z = top;
                    }
                    0.0
                } else {
                    let x = pad.cum_x - w;
                    if !meets_next {
                        self.pads.insert(
                            index + 1,
                            Pad {
                                cum_x: pad.cum_x,
                                cum_z: top,
                            },
                        );
                    }
                    self.pads[index].cum_x = x;
                    x
                }
            }
            Situation::NoRight => {
                let prev = self.pads[index - 1];
                let meets_prev = approx_eq(top, prev.cum_z, eps);
                if full {
                    if meets_prev {
                        self.pads[index - 1].cum_x = pad.cum_x;
                        self.pads.remove(index);
                    } else {
                        self.pads[index].cum_z = top;
                    }
                } else if meets_prev {
                    self.pads[index - 1].cum_x += w;
                } else {
                    self.pads.insert(
                        index,
                        Pad {
                            cum_x: prev.cum_x + w,
                            cum_z: top,
                        },
                    );
                }
                prev.cum_x
            }
            Situation::EvenNotch => {
                let prev = self.pads[index - 1];
                let next = self.pads[index + 1];
                let aligned = approx_eq(top, prev.cum_z, eps);
                if full {
                    if approx_eq(top, next.cum_z, eps) {
                        self.pads[index - 1].cum_x = next.cum_x;
                        self.pads.drain(index..=index + 1);
                    } else {
                        self.pads[index].cum_z = top;
                    }
                    prev.cum_x
                } else if prev.cum_x < self.width - pad.cum_x {
                    if aligned {
                        self.pads[index].cum_x -= w;
                        pad.cum_x - w
                    } else {
                        self.pads.insert(
                            index,
                            Pad {
                                cum_x: prev.cum_x + w,
                                cum_z: top,
                            },
                        );
                        prev.cum_x
                    }
                } else if aligned {
                    self.pads[index - 1].cum_x += w;
                    prev.cum_x
                } else {
                    self.pads.insert(
                        index + 1,
                        Pad {
                            cum_x: pad.cum_x,
                            cum_z: top,
                        },
                    );
                    self.pads[index].cum_x -= w;
                    pad.cum_x - w
                }
            }
            Situation::UnevenNotch => {
                let prev = self.pads[index - 1];
                let next = self.pads[index + 1];
                if full {
                    if approx_eq(top, prev.cum_z, eps) {
                        self.pads[index - 1].cum_x = pad.cum_x;
                        self.pads.remove(index);
                    } else {
                        self.pads[index].cum_z = top;
                    }
                    prev.cum_x
                } else if approx_eq(top, prev.cum_z, eps) {
                    self.pads[index - 1].cum_x += w;
                    prev.cum_x
                } else if approx_eq(top, next.cum_z, eps) {
                    self.pads[index].cum_x -= w;
                    pad.cum_x - w
                } else {
                    self.pads.insert(
                        index,
                        Pad {
                            cum_x: prev.cum_x + w,
                            cum_z: top,
                        },
                    );
                    prev.cum_x
                }
            }
        }
    }

    /// Gives up on pad `index` by merging it into a neighbour.
    ///
    /// Returns `false` when the pad is the only one left, which ends the layer.
    pub fn close(&mut self, index: usize) -> bool {
        match self.situation(index) {
            Situation::Open => return false,
            Situation::NoLeft => {
                self.pads[index] = self.pads[index + 1];
                self.pads.remove(index + 1);
            }
            Situation::NoRight => {
                self.pads[index - 1].cum_x = self.pads[index].cum_x;
                self.pads.remove(index);
            }
            Situation::EvenNotch => {
                self.pads[index - 1].cum_x = self.pads[index + 1].cum_x;
                self.pads.drain(index..=index + 1);
            }
            Situation::UnevenNotch => {
                if self.pads[index - 1].cum_z < self.pads[index + 1].cum_z {
                    self.pads[index - 1].cum_x = self.pads[index].cum_x;
                }
                self.pads.remove(index);
            }
        }
        true
    }
}
