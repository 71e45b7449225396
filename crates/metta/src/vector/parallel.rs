//! Parallel vectorization backend.
//!
//! Steps environments in parallel using rayon. The call still blocks until
//! every environment has stepped.

use super::vecenv::{
    reset_agents, split_actions, step_or_reset, ObservationBatch, VecEnvBackend, VecEnvResult,
};
use crate::env::{ActionBatch, EnvInfo, MettaEnv};
use crate::spaces::DynSpace;
use crate::Result;
use rayon::prelude::*;

/// Parallel vectorization backend using rayon
pub struct Parallel<E: MettaEnv> {
    /// Environments owned by the backend
    envs: Vec<E>,
    /// Cached observation shape
    obs_shape: Vec<usize>,
    /// Cached observation and action spaces
    obs_space: DynSpace,
    action_space: DynSpace,
}

impl<E: MettaEnv> Parallel<E> {
    /// Create a new parallel backend
    pub fn new<F>(env_creator: F, num_envs: usize) -> Self
    where
        F: Fn() -> E + Send + Sync,
    {
        assert!(num_envs > 0, "Number of environments must be > 0");

        // Create all envs in parallel
        let envs: Vec<_> = (0..num_envs)
            .into_par_iter()
            .map(|_| env_creator())
            .collect();

        let obs_space = envs[0].observation_space();
        let action_space = envs[0].action_space();
        let obs_shape = obs_space.shape().to_vec();

        Self {
            envs,
            obs_shape,
            obs_space,
            action_space,
        }
    }
}

impl<E: MettaEnv> VecEnvBackend for Parallel<E> {
    fn observation_space(&self) -> DynSpace {
        self.obs_space.clone()
    }

    fn action_space(&self) -> DynSpace {
        self.action_space.clone()
    }

    fn num_envs(&self) -> usize {
        self.envs.len()
    }

    fn num_agents(&self) -> usize {
        self.envs.iter().map(|env| env.num_agents()).sum()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ObservationBatch, Vec<EnvInfo>)> {
        let results = self
            .envs
            .par_iter_mut()
            .enumerate()
            .map(|(i, env)| reset_agents(env, seed.map(|s| s.wrapping_add(i as u64))))
            .collect::<Result<Vec<_>>>()?;

        let (observations, infos): (Vec<_>, Vec<_>) = results.into_iter().flatten().unzip();
        Ok((ObservationBatch::stack(observations, &self.obs_shape)?, infos))
    }

    fn step(&mut self, actions: &ActionBatch) -> Result<VecEnvResult> {
        let per_env = split_actions(actions, self.envs.iter().map(|env| env.num_agents()))?;
        let steps = self
            .envs
            .par_iter_mut()
            .zip(per_env.par_iter())
            .map(|(env, env_actions)| step_or_reset(env, env_actions))
            .collect::<Result<Vec<_>>>()?;
        VecEnvResult::collect(steps.into_iter().flatten().collect(), &self.obs_shape)
    }

    fn env(&self, index: usize) -> Option<&dyn MettaEnv> {
        self.envs.get(index).map(|e| e as &dyn MettaEnv)
    }

    fn close(&mut self) {
        self.envs.par_iter_mut().for_each(|env| {
            env.close();
        });
    }
}
