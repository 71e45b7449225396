//! Environment traits and the action types environments consume.
//!
//! Provides the `MettaEnv` trait every simulated environment implements,
//! the per-instance `Action` and batched `ActionBatch`, and `GridObject`
//! snapshots for read-only inspection of simulated entities.

mod action;
mod traits;
mod wrappers;

pub use action::{Action, ActionBatch};
pub use traits::{EnvInfo, GridObject, MettaEnv, StepResult};
pub use wrappers::EpisodeStats;
