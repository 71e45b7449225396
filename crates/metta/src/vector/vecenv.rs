//! Vectorized environment abstraction.

use crate::env::{Action, ActionBatch, EnvInfo, MettaEnv, StepResult};
use crate::spaces::DynSpace;
use crate::{MettaError, Result};
use candle_core::{Device, Tensor};
use ndarray::{ArrayD, IxDyn};

/// Observation batch that can reside on CPU or on a candle device
#[derive(Clone, Debug)]
pub enum ObservationBatch {
    /// `[N, ...obs_shape]` array
    Cpu(ArrayD<f32>),
    /// Candle tensor (possibly on GPU)
    Candle(Tensor),
}

impl ObservationBatch {
    /// Number of rows, one per agent
    pub fn batch_size(&self) -> usize {
        match self {
            Self::Cpu(a) => a.shape().first().copied().unwrap_or(0),
            Self::Candle(t) => t.dims().first().copied().unwrap_or(0),
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Cpu(a) => a.shape().to_vec(),
            Self::Candle(t) => t.dims().to_vec(),
        }
    }

    /// Move onto `device` as an f32 tensor
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        match self {
            Self::Cpu(a) => {
                let data: Vec<f32> = a.iter().copied().collect();
                Ok(Tensor::from_vec(data, a.shape(), device)?)
            }
            Self::Candle(t) => Ok(t.to_device(device)?),
        }
    }

    /// Stack per-agent observations into one `[N, ...obs_shape]` batch
    pub fn stack(observations: Vec<ArrayD<f32>>, obs_shape: &[usize]) -> Result<Self> {
        let mut shape = Vec::with_capacity(obs_shape.len() + 1);
        shape.push(observations.len());
        shape.extend_from_slice(obs_shape);

        let mut flat = Vec::with_capacity(shape.iter().product());
        for obs in observations {
            if obs.shape() != obs_shape {
                return Err(MettaError::ShapeMismatch {
                    expected: obs_shape.to_vec(),
                    actual: obs.shape().to_vec(),
                });
            }
            flat.extend(obs.iter().copied());
        }
        let array = ArrayD::from_shape_vec(IxDyn(&shape), flat).map_err(|e| {
            MettaError::InvalidConfig(format!("cannot stack observations: {e}"))
        })?;
        Ok(Self::Cpu(array))
    }
}

/// Result from stepping all environments, one row per agent
#[derive(Clone, Debug)]
pub struct VecEnvResult {
    pub observations: ObservationBatch,
    pub rewards: Vec<f32>,
    /// Terminated flags
    pub terminated: Vec<bool>,
    /// Truncated flags
    pub truncated: Vec<bool>,
    /// Info dictionaries
    pub infos: Vec<EnvInfo>,
}

impl VecEnvResult {
    pub(crate) fn collect(
        steps: Vec<StepResult>,
        obs_shape: &[usize],
    ) -> Result<Self> {
        let n = steps.len();
        let mut observations = Vec::with_capacity(n);
        let mut rewards = Vec::with_capacity(n);
        let mut terminated = Vec::with_capacity(n);
        let mut truncated = Vec::with_capacity(n);
        let mut infos = Vec::with_capacity(n);
        for step in steps {
            observations.push(step.observation);
            rewards.push(step.reward);
            terminated.push(step.terminated);
            truncated.push(step.truncated);
            infos.push(step.info);
        }
        Ok(Self {
            observations: ObservationBatch::stack(observations, obs_shape)?,
            rewards,
            terminated,
            truncated,
            infos,
        })
    }
}

/// Trait for vectorized environment backends
pub trait VecEnvBackend: Send {
    /// Get the observation space (single env)
    fn observation_space(&self) -> DynSpace;

    /// Get the action space (single env)
    fn action_space(&self) -> DynSpace;

    /// Get the number of environments
    fn num_envs(&self) -> usize;

    /// Number of agents across all environments. Every per-step vector has
    /// one row per agent, environment 0's agents first.
    fn num_agents(&self) -> usize;

    /// Reset all environments. Environment `i` is seeded with `seed + i`.
    fn reset(&mut self, seed: Option<u64>) -> Result<(ObservationBatch, Vec<EnvInfo>)>;

    /// Step all environments with one action per agent. An environment that
    /// was done is reset instead of stepped and reports zero reward.
    fn step(&mut self, actions: &ActionBatch) -> Result<VecEnvResult>;

    /// Read-only view of environment `index`
    fn env(&self, index: usize) -> Option<&dyn MettaEnv>;

    /// Close all environments
    fn close(&mut self);
}

/// Reset one environment, checking it returns a row per agent
pub(crate) fn reset_agents<E: MettaEnv>(
    env: &mut E,
    seed: Option<u64>,
) -> Result<Vec<(ArrayD<f32>, EnvInfo)>> {
    let rows = env.multi_reset(seed)?;
    check_rows(rows.len(), env.num_agents())?;
    Ok(rows)
}

/// Step or auto-reset one environment, one row per agent
pub(crate) fn step_or_reset<E: MettaEnv>(env: &mut E, actions: &[Action]) -> Result<Vec<StepResult>> {
    if env.is_done() {
        let rows = reset_agents(env, None)?;
        return Ok(rows
            .into_iter()
            .map(|(observation, info)| StepResult {
                observation,
                reward: 0.0,
                terminated: false,
                truncated: false,
                info,
            })
            .collect());
    }
    let steps = env.multi_step(actions)?;
    check_rows(steps.len(), env.num_agents())?;
    Ok(steps)
}

/// Split a flat per-agent batch into one action list per environment
pub(crate) fn split_actions(
    actions: &ActionBatch,
    agents_per_env: impl IntoIterator<Item = usize>,
) -> Result<Vec<Vec<Action>>> {
    let mut offset = 0;
    let mut per_env = Vec::new();
    for n in agents_per_env {
        per_env.push((offset..offset + n).filter_map(|i| actions.get(i)).collect());
        offset += n;
    }
    check_rows(actions.len(), offset)?;
    Ok(per_env)
}

fn check_rows(actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(MettaError::ShapeMismatch {
            expected: vec![expected],
            actual: vec![actual],
        });
    }
    Ok(())
}
