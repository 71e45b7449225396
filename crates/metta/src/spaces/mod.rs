//! Observation and action space types.
//!
//! Gymnasium-style space definitions plus the closed `ActionSpaceDescriptor`
//! that policy construction dispatches on.

mod action;
mod bounded;
mod discrete;

pub use action::ActionSpaceDescriptor;
pub use bounded::Box;
pub use discrete::{Discrete, MultiDiscrete};

use rand::Rng;
use std::fmt;

/// Trait for observation and action spaces
pub trait Space: Clone + Send + Sync {
    /// The type of samples from this space
    type Sample;

    /// Sample a random element from this space
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Sample;

    /// Check if a value is contained in this space
    fn contains(&self, value: &Self::Sample) -> bool;

    /// Get the shape of samples from this space
    fn shape(&self) -> &[usize];

    /// Get the total number of elements in a sample
    fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }
}

/// Enum for dynamic space types
#[derive(Clone, Debug, PartialEq)]
pub enum DynSpace {
    Discrete(Discrete),
    MultiDiscrete(MultiDiscrete),
    Box(Box),
}

impl DynSpace {
    /// Get the shape of this space
    pub fn shape(&self) -> &[usize] {
        match self {
            DynSpace::Discrete(s) => s.shape(),
            DynSpace::MultiDiscrete(s) => s.shape(),
            DynSpace::Box(s) => s.shape(),
        }
    }
}

impl fmt::Display for DynSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynSpace::Discrete(s) => write!(f, "{s}"),
            DynSpace::MultiDiscrete(s) => write!(f, "{s}"),
            DynSpace::Box(s) => write!(f, "{s}"),
        }
    }
}
