//! Actions as environments receive them.

use crate::spaces::ActionSpaceDescriptor;
use crate::{MettaError, Result};
use ndarray::Array2;

/// Action for one environment instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Discrete(i64),
    /// `[action_type, action_param]`
    MultiDiscrete([i64; 2]),
}

impl Action {
    /// Whether the action fits the given action space
    pub fn fits(&self, space: &ActionSpaceDescriptor) -> bool {
        let in_range = |v: i64, n: usize| v >= 0 && (v as usize) < n;
        match (*self, *space) {
            (Action::Discrete(a), ActionSpaceDescriptor::Discrete { n }) => in_range(a, n),
            (Action::MultiDiscrete([t, p]), ActionSpaceDescriptor::MultiDiscrete2 { n0, n1 }) => {
                in_range(t, n0) && in_range(p, n1)
            }
            _ => false,
        }
    }
}

/// Actions for a batch of N instances: a scalar per instance for `Discrete`,
/// a pair per instance for `MultiDiscrete2`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionBatch {
    Discrete(Vec<i64>),
    MultiDiscrete(Vec<[i64; 2]>),
}

impl ActionBatch {
    /// Pair up type and param samples; `params` is `None` for a single head.
    pub fn from_samples(types: Vec<i64>, params: Option<Vec<i64>>) -> Result<Self> {
        match params {
            None => Ok(ActionBatch::Discrete(types)),
            Some(params) => {
                if params.len() != types.len() {
                    return Err(MettaError::ShapeMismatch {
                        expected: vec![types.len()],
                        actual: vec![params.len()],
                    });
                }
                Ok(ActionBatch::MultiDiscrete(
                    types.into_iter().zip(params).map(|(t, p)| [t, p]).collect(),
                ))
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ActionBatch::Discrete(v) => v.len(),
            ActionBatch::MultiDiscrete(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Action for instance `i`
    pub fn get(&self, i: usize) -> Option<Action> {
        match self {
            ActionBatch::Discrete(v) => v.get(i).map(|&a| Action::Discrete(a)),
            ActionBatch::MultiDiscrete(v) => v.get(i).map(|&a| Action::MultiDiscrete(a)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// `[N, 1]` or `[N, 2]` integer array
    pub fn to_array(&self) -> Array2<i64> {
        match self {
            ActionBatch::Discrete(v) => Array2::from_shape_fn((v.len(), 1), |(i, _)| v[i]),
            ActionBatch::MultiDiscrete(v) => Array2::from_shape_fn((v.len(), 2), |(i, j)| v[i][j]),
        }
    }
}
