//! Built-in environments for metta.
//!
//! - `GridForage` - grid world with resources to pick up, used for demos
//!   and end-to-end runs
//! - `ScriptedEnv` - plays back a fixed reward and termination schedule,
//!   used to pin down interaction-loop behavior
//! - `ScriptedSquad` - several scripted agents in one instance

mod grid_forage;
mod scripted;

pub use grid_forage::{GridForage, GridForageConfig};
pub use scripted::{ScriptedEnv, ScriptedSquad};
