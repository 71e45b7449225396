//! Serial (sequential) vectorization backend.
//!
//! Runs environments one at a time in a single thread.
//! Useful for debugging and small-scale experiments.

use super::vecenv::{
    reset_agents, split_actions, step_or_reset, ObservationBatch, VecEnvBackend, VecEnvResult,
};
use crate::env::{ActionBatch, EnvInfo, MettaEnv};
use crate::spaces::DynSpace;
use crate::Result;

/// Serial vectorization backend
pub struct Serial<E: MettaEnv> {
    /// Created environments
    envs: Vec<E>,
    /// Cached observation shape
    obs_shape: Vec<usize>,
}

impl<E: MettaEnv> Serial<E> {
    /// Create a new serial backend
    pub fn new<F>(env_creator: F, num_envs: usize) -> Self
    where
        F: Fn() -> E,
    {
        Self::from_envs((0..num_envs).map(|_| env_creator()).collect())
    }

    /// Wrap already constructed environments, e.g. with per-instance settings
    pub fn from_envs(envs: Vec<E>) -> Self {
        assert!(!envs.is_empty(), "Number of environments must be > 0");
        let obs_shape = envs[0].observation_space().shape().to_vec();
        Self { envs, obs_shape }
    }

    pub fn envs(&self) -> &[E] {
        &self.envs
    }
}

impl<E: MettaEnv> VecEnvBackend for Serial<E> {
    fn observation_space(&self) -> DynSpace {
        self.envs[0].observation_space()
    }

    fn action_space(&self) -> DynSpace {
        self.envs[0].action_space()
    }

    fn num_envs(&self) -> usize {
        self.envs.len()
    }

    fn num_agents(&self) -> usize {
        self.envs.iter().map(|env| env.num_agents()).sum()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ObservationBatch, Vec<EnvInfo>)> {
        let mut observations = Vec::with_capacity(self.envs.len());
        let mut infos = Vec::with_capacity(self.envs.len());

        for (i, env) in self.envs.iter_mut().enumerate() {
            let env_seed = seed.map(|s| s.wrapping_add(i as u64));
            for (obs, info) in reset_agents(env, env_seed)? {
                observations.push(obs);
                infos.push(info);
            }
        }

        Ok((ObservationBatch::stack(observations, &self.obs_shape)?, infos))
    }

    fn step(&mut self, actions: &ActionBatch) -> Result<VecEnvResult> {
        let per_env = split_actions(actions, self.envs.iter().map(|env| env.num_agents()))?;
        let mut steps = Vec::with_capacity(actions.len());
        for (env, env_actions) in self.envs.iter_mut().zip(&per_env) {
            steps.extend(step_or_reset(env, env_actions)?);
        }
        VecEnvResult::collect(steps, &self.obs_shape)
    }

    fn env(&self, index: usize) -> Option<&dyn MettaEnv> {
        self.envs.get(index).map(|e| e as &dyn MettaEnv)
    }

    fn close(&mut self) {
        for env in &mut self.envs {
            env.close();
        }
    }
}
