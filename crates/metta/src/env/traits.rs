//! Core environment trait definitions.

use super::Action;
use crate::spaces::DynSpace;
use crate::{MettaError, Result};
use ndarray::ArrayD;
use smallvec::SmallVec;

/// Information returned from environment resets and steps
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvInfo {
    /// Episode return (set when an episode ends)
    pub episode_return: Option<f32>,
    /// Episode length (set when an episode ends)
    pub episode_length: Option<f32>,
    /// Custom numeric metrics
    pub extra: SmallVec<[(&'static str, f32); 4]>,
}

impl EnvInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add episode stats
    pub fn with_episode_stats(mut self, ret: f32, len: u32) -> Self {
        self.episode_return = Some(ret);
        self.episode_length = Some(len as f32);
        self
    }

    /// Add a custom metric
    pub fn with_extra(mut self, key: &'static str, value: f32) -> Self {
        self.extra.push((key, value));
        self
    }

    /// Get a value by key, episode stats included
    pub fn get(&self, key: &str) -> Option<f32> {
        match key {
            "episode_return" => self.episode_return,
            "episode_length" => self.episode_length,
            _ => self.extra.iter().find(|(k, _)| *k == key).map(|(_, v)| *v),
        }
    }

    /// All metrics present, episode stats first
    pub fn metrics(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.episode_return
            .map(|v| ("episode_return", v))
            .into_iter()
            .chain(self.episode_length.map(|v| ("episode_length", v)))
            .chain(self.extra.iter().copied())
    }
}

/// Result from a single environment step
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Observation after the step
    pub observation: ArrayD<f32>,
    pub reward: f32,
    /// Episode reached a natural terminal condition
    pub terminated: bool,
    /// Episode was cut off by an external limit
    pub truncated: bool,
    pub info: EnvInfo,
}

impl StepResult {
    /// Terminated or truncated
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Snapshot of one simulated entity, for renderers and other read-only observers.
#[derive(Clone, Debug, PartialEq)]
pub struct GridObject {
    pub id: u32,
    /// Entity type, e.g. `"agent"` or `"wall"`
    pub kind: &'static str,
    pub row: usize,
    pub col: usize,
    pub properties: SmallVec<[(&'static str, f32); 4]>,
}

impl GridObject {
    pub fn new(id: u32, kind: &'static str, row: usize, col: usize) -> Self {
        Self {
            id,
            kind,
            row,
            col,
            properties: SmallVec::new(),
        }
    }

    pub fn with_property(mut self, key: &'static str, value: f32) -> Self {
        self.properties.push((key, value));
        self
    }

    pub fn property(&self, key: &str) -> Option<f32> {
        self.properties.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

/// A single simulated environment instance.
///
/// An instance hosts [`MettaEnv::num_agents`] agents. Single-agent
/// environments only implement [`MettaEnv::reset`] and [`MettaEnv::step`];
/// environments with several agents override [`MettaEnv::multi_reset`] and
/// [`MettaEnv::multi_step`], which produce one row per agent.
///
/// # Example
///
/// ```rust,ignore
/// use metta::env::{Action, EnvInfo, MettaEnv, StepResult};
/// use metta::spaces::{Box as BoxSpace, Discrete, DynSpace};
///
/// struct Corridor { pos: usize }
///
/// impl MettaEnv for Corridor {
///     fn observation_space(&self) -> DynSpace {
///         DynSpace::Box(BoxSpace::grid(1, 1, 8, 1.0))
///     }
///
///     fn action_space(&self) -> DynSpace {
///         DynSpace::Discrete(Discrete::new(2))
///     }
///
///     fn reset(&mut self, _seed: Option<u64>) -> metta::Result<(ArrayD<f32>, EnvInfo)> {
///         self.pos = 0;
///         Ok((self.observe(), EnvInfo::new()))
///     }
///
///     fn step(&mut self, action: Action) -> metta::Result<StepResult> {
///         // ... move, reward, terminate at the end of the corridor
///     }
/// }
/// ```
pub trait MettaEnv: Send {
    fn observation_space(&self) -> DynSpace;

    fn action_space(&self) -> DynSpace;

    /// Reset to an initial state. `seed` makes the episode reproducible.
    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)>;

    /// Advance one step. A failure here aborts the whole batch step.
    fn step(&mut self, action: Action) -> Result<StepResult>;

    /// Number of agents acting in this instance
    fn num_agents(&self) -> usize {
        1
    }

    /// Reset and return one observation and info per agent
    fn multi_reset(&mut self, seed: Option<u64>) -> Result<Vec<(ArrayD<f32>, EnvInfo)>> {
        Ok(vec![self.reset(seed)?])
    }

    /// Advance one step with one action per agent, in agent order
    fn multi_step(&mut self, actions: &[Action]) -> Result<Vec<StepResult>> {
        match *actions {
            [action] => Ok(vec![self.step(action)?]),
            _ => Err(MettaError::ShapeMismatch {
                expected: vec![1],
                actual: vec![actions.len()],
            }),
        }
    }

    /// Entities currently alive in the simulation
    fn grid_objects(&self) -> &[GridObject] {
        &[]
    }

    /// Optional: Render the environment
    fn render(&self) -> Option<String> {
        None
    }

    /// Optional: Close the environment and free resources
    fn close(&mut self) {}

    /// Whether the episode has ended and the next step should reset
    fn is_done(&self) -> bool {
        false
    }
}
