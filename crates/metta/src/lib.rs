//! # Metta
//!
//! Action-space-conditioned recurrent policies and a vectorized interaction
//! loop, in Rust.
//!
//! ## Overview
//!
//! Metta provides:
//! - Gymnasium-style spaces and the `ActionSpaceDescriptor` the policy is
//!   built from
//! - The `MettaEnv` trait and vectorized backends (serial and parallel)
//! - `PolicyModule`: encoder, LSTM core, decoder, critic and one or two
//!   action heads, built on candle
//! - `Simulator`: drives a policy against a batch of environments until
//!   every instance has finished or the step budget runs out
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use metta::prelude::*;
//! use metta_envs::GridForage;
//!
//! let backend = Serial::new(|| GridForage::new(GridForageConfig::default()), 4);
//! let policy = PolicyModule::new(
//!     &backend.observation_space(),
//!     &backend.action_space(),
//!     &GridForage::grid_features(),
//!     &GridForage::global_features(),
//!     &WeightTransforms::new(),
//!     PolicyConfig::default(),
//!     Device::Cpu,
//! )?;
//!
//! let mut sim = Simulator::new(SimulatorConfig::default(), &policy, backend)?;
//! let termination = sim.run()?;
//! println!("{termination:?}: {:?}", sim.total_rewards());
//! ```

pub mod config;
pub mod env;
pub mod log;
pub mod policy;
pub mod simulator;
pub mod spaces;
pub mod stats;
pub mod utils;
pub mod vector;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        CoreConfig, DecoderConfig, EncoderConfig, HeadConfig, PolicyConfig, SimulatorConfig,
    };
    pub use crate::env::{Action, ActionBatch, EnvInfo, GridObject, MettaEnv, StepResult};
    pub use crate::log::{CompositeLogger, ConsoleLogger, MetricLogger, NoOpLogger};
    pub use crate::policy::{
        Activation, ActionHeads, ActionLogits, AuxiliaryObjective, Inference, PolicyModule,
        RecurrentState, WeightTransforms,
    };
    pub use crate::simulator::{Simulator, SimulatorState, Termination};
    pub use crate::spaces::{
        ActionSpaceDescriptor, Box as BoxSpace, Discrete, DynSpace, MultiDiscrete, Space,
    };
    pub use crate::stats::SimulationStats;
    pub use crate::vector::{ObservationBatch, Parallel, Serial, VecEnvBackend, VecEnvResult};
    pub use candle_core::Device;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum MettaError {
    #[error("Unsupported action space: {0}")]
    UnsupportedActionSpace(String),

    #[error("Environment step failed: {0}")]
    EnvironmentStep(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Unknown activation: {0}")]
    UnknownActivation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("No auxiliary objective registered")]
    AuxLossUnavailable,

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, MettaError>;
