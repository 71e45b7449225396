//! The assembled policy: encoder, LSTM core, decoder, critic and action heads.

use super::decoder::Decoder;
use super::distribution::Categorical;
use super::encoder::ObservationEncoder;
use super::heads::{ActionHeadBuilder, ActionHeads, ActionLogits};
use super::hooks::WeightTransforms;
use super::init::{LayerRecord, WeightInitializer};
use super::recurrent::{RecurrentCore, RecurrentState};
use super::stack::LinearStack;
use super::store::ParamStore;
use crate::config::PolicyConfig;
use crate::env::ActionBatch;
use crate::spaces::{ActionSpaceDescriptor, DynSpace};
use crate::{MettaError, Result};
use candle_core::{Device, Module, Tensor};
use rand::Rng;
use std::path::Path;

/// Everything one inference step produces.
#[derive(Debug, Clone)]
pub struct Inference {
    /// One action per instance, shaped by the action space
    pub actions: ActionBatch,
    /// Core state after this step, same batch size as the observations
    pub state: RecurrentState,
    pub logits: ActionLogits,
    /// Critic estimate per instance, `[N]`
    pub values: Tensor,
    /// Joint log-probability of the sampled actions, `[N]`
    pub log_probs: Tensor,
    /// Joint entropy of the action distribution(s), `[N]`
    pub entropy: Tensor,
}

/// An auxiliary objective a training component can attach to a policy.
pub trait AuxiliaryObjective: Send + Sync {
    fn loss(
        &self,
        policy: &PolicyModule,
        observations: &Tensor,
        state: Option<&RecurrentState>,
    ) -> Result<Tensor>;
}

/// Recurrent actor-critic whose action heads follow the action space.
///
/// Weights are only written during construction and by [`PolicyModule::load`];
/// inference borrows the module immutably.
pub struct PolicyModule {
    store: ParamStore,
    encoder: ObservationEncoder,
    core: RecurrentCore,
    decoder: Decoder,
    critic: LinearStack,
    heads: ActionHeads,
    action_space: ActionSpaceDescriptor,
    layers: Vec<LayerRecord>,
    config: PolicyConfig,
    aux: Option<Box<dyn AuxiliaryObjective>>,
}

impl PolicyModule {
    /// Build the full graph, run the weight transforms, then initialize.
    ///
    /// Fails with [`MettaError::UnsupportedActionSpace`] before any parameter
    /// exists when the action space has no head layout.
    pub fn new(
        observation_space: &DynSpace,
        action_space: &DynSpace,
        grid_features: &[String],
        global_features: &[String],
        transforms: &WeightTransforms,
        config: PolicyConfig,
        device: Device,
    ) -> Result<Self> {
        let descriptor = ActionSpaceDescriptor::try_from(action_space)?;
        if !matches!(observation_space, DynSpace::Box(_)) {
            return Err(MettaError::InvalidConfig(format!(
                "observations must be a Box space, got {observation_space}"
            )));
        }

        let store = ParamStore::new(device);
        let mut layers = Vec::new();

        let encoder = ObservationEncoder::new(
            &store,
            observation_space.shape(),
            grid_features,
            global_features,
            &config.encoder,
            &mut layers,
        )?;
        let core = RecurrentCore::new(
            &store,
            encoder.output_size(),
            config.core.rnn_size,
            &mut layers,
        )?;
        let decoder = Decoder::new(
            &store,
            core.hidden_size(),
            &config.decoder,
            transforms.key("decoder"),
            &mut layers,
        )?;
        let critic = LinearStack::new(
            &store,
            "critic",
            decoder.out_size(),
            1,
            &config.critic.hidden_sizes,
            config.critic.activation,
            transforms.key("critic"),
            &mut layers,
        )?;
        let heads = ActionHeadBuilder {
            store: &store,
            hidden_sizes: &config.actor.hidden_sizes,
            activation: config.actor.activation,
            transform: transforms.key("actor"),
        }
        .build(decoder.out_size(), &descriptor, &mut layers)?;

        WeightInitializer::new(config.seed).initialize(&store, &layers)?;

        tracing::info!(
            action_space = %descriptor,
            heads = descriptor.num_heads(),
            head_sizes = ?descriptor.head_sizes(),
            layers = layers.len(),
            parameters = store.num_parameters(),
            "built policy"
        );

        Ok(Self {
            store,
            encoder,
            core,
            decoder,
            critic,
            heads,
            action_space: descriptor,
            layers,
            config,
            aux: None,
        })
    }

    /// Attach the objective [`PolicyModule::aux_loss`] delegates to
    pub fn with_aux_objective(mut self, objective: impl AuxiliaryObjective + 'static) -> Self {
        self.aux = Some(Box::new(objective));
        self
    }

    /// `[N, C, H, W] -> [N, encoder.output_size]`
    pub fn encode_observations(&self, observations: &Tensor) -> Result<Tensor> {
        self.encoder.forward(observations)
    }

    /// Decoded state `[N, decoder_out_size]` and values `[N]`
    pub fn decode_state(&self, core_output: &Tensor) -> Result<(Tensor, Tensor)> {
        let state = self.decoder.forward(core_output)?;
        let values = self.critic.forward(&state)?.squeeze(1)?;
        Ok((state, values))
    }

    /// One step: encode, advance the core, decode, sample actions.
    ///
    /// Every returned tensor is detached from the weights, so a long rollout
    /// holds one step's worth of tensors at a time.
    pub fn infer<R: Rng + ?Sized>(
        &self,
        observations: &Tensor,
        state: Option<&RecurrentState>,
        rng: &mut R,
    ) -> Result<Inference> {
        let batch = observations.dim(0)?;
        if let Some(state) = state {
            if state.batch_size() != batch {
                return Err(MettaError::ShapeMismatch {
                    expected: vec![batch],
                    actual: vec![state.batch_size()],
                });
            }
        }

        let encoded = self.encode_observations(observations)?;
        let (core_output, next_state) = self.core.step(&encoded, state)?;
        let (decoded, values) = self.decode_state(&core_output)?;
        let logits = self.heads.forward(&decoded)?;

        let type_dist = Categorical::new(logits.type_logits().clone());
        let types = type_dist.sample(rng)?;
        let mut log_probs = type_dist.log_prob(&types)?;
        let mut entropy = type_dist.entropy()?;

        let params = match logits.param_logits() {
            Some(param_logits) => {
                let param_dist = Categorical::new(param_logits.clone());
                let params = param_dist.sample(rng)?;
                log_probs = (log_probs + param_dist.log_prob(&params)?)?;
                entropy = (entropy + param_dist.entropy()?)?;
                Some(params)
            }
            None => None,
        };

        Ok(Inference {
            actions: ActionBatch::from_samples(types, params)?,
            state: next_state,
            logits: logits.detach(),
            values: values.detach(),
            log_probs: log_probs.detach(),
            entropy: entropy.detach(),
        })
    }

    /// Auxiliary loss from the attached objective.
    ///
    /// Fails with [`MettaError::AuxLossUnavailable`] when none is attached.
    pub fn aux_loss(
        &self,
        observations: &Tensor,
        state: Option<&RecurrentState>,
    ) -> Result<Tensor> {
        match &self.aux {
            Some(objective) => objective.loss(self, observations, state),
            None => Err(MettaError::AuxLossUnavailable),
        }
    }

    pub fn action_space(&self) -> &ActionSpaceDescriptor {
        &self.action_space
    }

    pub fn action_heads(&self) -> &ActionHeads {
        &self.heads
    }

    pub fn decoder_out_size(&self) -> usize {
        self.decoder.out_size()
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Every constructed layer in build order
    pub fn layers(&self) -> &[LayerRecord] {
        &self.layers
    }

    pub fn params(&self) -> &ParamStore {
        &self.store
    }

    pub fn device(&self) -> &Device {
        self.store.device()
    }

    pub fn num_parameters(&self) -> usize {
        self.store.num_parameters()
    }

    /// Zero core state for `batch_size` instances
    pub fn initial_state(&self, batch_size: usize) -> Result<RecurrentState> {
        self.core.initial_state(batch_size)
    }

    /// Save parameters to a safetensors file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.store.save(path)
    }

    /// Load parameters written by [`PolicyModule::save`] from a policy with the
    /// same layout
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.store.load(path)
    }
}
