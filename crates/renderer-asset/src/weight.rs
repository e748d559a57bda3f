//! Per-vertex bone influence aggregation.
//!
//! Source formats may list any number of influences per vertex, in any order
//! and with repeated joints. Hardware skinning wants a fixed number of slots
//! per vertex, so [`WeightAggregator`] keeps everything it is given and only
//! reduces to the strongest influences when the buffers are written.

use std::cmp::Ordering;

/// Default number of influence slots per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// Integer type a joint index buffer is stored in.
///
/// The caller picks the width, so conversion truncates without checks.
pub trait JointIndex: Copy + Default {
    fn from_joint_id(id: u32) -> Self;
}

impl JointIndex for u8 {
    #[inline]
    fn from_joint_id(id: u32) -> Self {
        id as u8
    }
}

impl JointIndex for u16 {
    #[inline]
    fn from_joint_id(id: u32) -> Self {
        id as u16
    }
}

impl JointIndex for u32 {
    #[inline]
    fn from_joint_id(id: u32) -> Self {
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Influence {
    pub joint: u32,
    pub weight: f32,
}

#[derive(Debug, Clone)]
pub struct WeightAggregator {
    max_influences: usize,
    influences: Vec<Influence>,
}

impl Default for WeightAggregator {
    fn default() -> Self {
        Self::new(MAX_INFLUENCES)
    }
}

impl WeightAggregator {
    pub fn new(max_influences: usize) -> Self {
        Self {
            max_influences,
            influences: Vec::new(),
        }
    }

    pub fn max_influences(&self) -> usize {
        self.max_influences
    }

    /// Records one contribution. Repeated joints are kept as separate entries.
    pub fn add(&mut self, joint: u32, weight: f32) {
        self.influences.push(Influence { joint, weight });
    }

    /// Number of contributions recorded so far, before any reduction.
    pub fn count(&self) -> usize {
        self.influences.len()
    }

    /// Strongest influences, at most `max_influences` of them, in the order
    /// they were added.
    ///
    /// Ranking is by descending weight, then by insertion order, then by
    /// ascending joint id.
    pub fn reduce(&self) -> Vec<Influence> {
        if self.influences.len() <= self.max_influences {
            return self.influences.clone();
        }

        let mut ranked: Vec<usize> = (0..self.influences.len()).collect();
        ranked.sort_by(|&a, &b| self.rank(a, b));
        ranked.truncate(self.max_influences);
        ranked.sort_unstable();
        ranked.into_iter().map(|index| self.influences[index]).collect()
    }

    fn rank(&self, a: usize, b: usize) -> Ordering {
        let (left, right) = (&self.influences[a], &self.influences[b]);
        right
            .weight
            .total_cmp(&left.weight)
            .then(a.cmp(&b))
            .then(left.joint.cmp(&right.joint))
    }

    /// Appends exactly `max_influences` joint indices to `dest`, padding
    /// unused slots with joint 0.
    pub fn write_indices<I: JointIndex>(&self, dest: &mut Vec<I>) {
        let reduced = self.reduce();
        let padding = self.max_influences - reduced.len();
        dest.extend(
            reduced
                .iter()
                .map(|influence| I::from_joint_id(influence.joint)),
        );
        dest.extend(std::iter::repeat(I::default()).take(padding));
    }

    /// Appends exactly `max_influences` weights to `dest`, padding unused
    /// slots with 0, which means "no influence".
    pub fn write_weights(&self, dest: &mut Vec<f32>) {
        let reduced = self.reduce();
        let padding = self.max_influences - reduced.len();
        dest.extend(reduced.iter().map(|influence| influence.weight));
        dest.extend(std::iter::repeat(0.0).take(padding));
    }
}

/// Scales `weights` so they sum to 1. Slices summing to zero, or to a
/// non-finite value, are left untouched.
pub fn normalize_weights(weights: &mut [f32]) {
    let sum: f32 = weights.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for weight in weights {
            *weight /= sum;
        }
    }
}
