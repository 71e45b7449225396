//! Policy assembly.
//!
//! A [`PolicyModule`] is an explicit owning struct:
//! - `ObservationEncoder` - conv stack over grid channels plus pooled globals
//! - `RecurrentCore` - single LSTM layer advanced one step per call
//! - `Decoder` - identity or MLP over the core output
//! - critic `LinearStack` and the [`ActionHeads`] chosen by the action space
//!
//! Weights pass through the caller's [`WeightTransforms`] as layers are built,
//! then [`WeightInitializer`] runs once over the whole layer registry.

mod activation;
mod agent;
mod decoder;
mod distribution;
mod encoder;
mod heads;
mod hooks;
mod init;
mod recurrent;
mod stack;
mod store;

pub use activation::Activation;
pub use agent::{AuxiliaryObjective, Inference, PolicyModule};
pub use decoder::Decoder;
pub use distribution::Categorical;
pub use encoder::ObservationEncoder;
pub use heads::{ActionHeadBuilder, ActionHeads, ActionLogits};
pub use hooks::{KeyedTransform, TransformFn, WeightTransforms};
pub use init::{orthogonal, InitScheme, LayerKind, LayerRecord, WeightInitializer};
pub use recurrent::{RecurrentCore, RecurrentState};
pub use stack::LinearStack;
pub use store::ParamStore;
