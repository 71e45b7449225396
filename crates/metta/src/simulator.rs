//! Interaction loop: drives a policy against a batch of environments.
//!
//! Each step is one `infer` followed by one blocking `step` of the backend.
//! An agent counts as finished once it has reported `terminated` or
//! `truncated`; the flag stays set even if the backend resets its environment.
//! The loop is done when every instance has finished or the step budget is
//! used up, whichever happens first.

use crate::config::SimulatorConfig;
use crate::env::{EnvInfo, GridObject};
use crate::log::MetricLogger;
use crate::policy::{ActionLogits, PolicyModule, RecurrentState};
use crate::stats::{InfoAccumulator, SimulationStats};
use crate::utils::{abbreviate, format_duration, seeded_rng};
use crate::vector::{ObservationBatch, VecEnvBackend, VecEnvResult};
use crate::{MettaError, Result};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// Why a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Every instance terminated or was truncated
    AllFinished,
    /// The step budget ran out first
    BudgetExhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulatorState {
    Idle,
    Stepping,
    Done(Termination),
}

impl SimulatorState {
    pub fn is_done(&self) -> bool {
        matches!(self, SimulatorState::Done(_))
    }
}

/// Runs a policy against a vectorized backend.
pub struct Simulator<'p, V: VecEnvBackend> {
    config: SimulatorConfig,
    policy: &'p PolicyModule,
    backend: V,
    num_agents: usize,
    observations: ObservationBatch,
    recurrent_state: Option<RecurrentState>,
    logits: Option<ActionLogits>,
    rewards: Vec<f32>,
    total_rewards: Vec<f32>,
    terminated: Vec<bool>,
    truncated: Vec<bool>,
    finished: Vec<bool>,
    infos: Vec<EnvInfo>,
    info_stats: InfoAccumulator,
    steps: usize,
    state: SimulatorState,
    rng: ChaCha8Rng,
    logger: Option<Box<dyn MetricLogger>>,
    start_time: Instant,
}

impl<'p, V: VecEnvBackend> Simulator<'p, V> {
    /// Reset the backend with `config.seed` and wait in `Idle`.
    pub fn new(config: SimulatorConfig, policy: &'p PolicyModule, mut backend: V) -> Result<Self> {
        let num_agents = backend.num_agents();
        let (observations, infos) = backend.reset(Some(config.seed))?;
        check_batch("observations", num_agents, observations.batch_size())?;

        let rng = seeded_rng(config.seed);
        Ok(Self {
            config,
            policy,
            backend,
            num_agents,
            observations,
            recurrent_state: None,
            logits: None,
            rewards: vec![0.0; num_agents],
            total_rewards: vec![0.0; num_agents],
            terminated: vec![false; num_agents],
            truncated: vec![false; num_agents],
            finished: vec![false; num_agents],
            infos,
            info_stats: InfoAccumulator::default(),
            steps: 0,
            state: SimulatorState::Idle,
            rng,
            logger: None,
            start_time: Instant::now(),
        })
    }

    /// Send stats to `logger` every `log_interval` steps and when the run ends
    pub fn with_logger(mut self, logger: Box<dyn MetricLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Continue from a recorded core state instead of a zero state
    pub fn with_recurrent_state(mut self, state: RecurrentState) -> Result<Self> {
        check_batch("recurrent state", self.num_agents, state.batch_size())?;
        self.recurrent_state = Some(state);
        Ok(self)
    }

    /// Replace the current observations, e.g. with ones recorded from another run
    pub fn with_observations(mut self, observations: ObservationBatch) -> Result<Self> {
        check_batch("observations", self.num_agents, observations.batch_size())?;
        self.observations = observations;
        Ok(self)
    }

    /// Back to `Idle` with fresh observations and cleared bookkeeping
    pub fn reset(&mut self) -> Result<()> {
        let (observations, infos) = self.backend.reset(Some(self.config.seed))?;
        check_batch("observations", self.num_agents, observations.batch_size())?;
        self.observations = observations;
        self.infos = infos;
        self.recurrent_state = None;
        self.logits = None;
        self.rewards.fill(0.0);
        self.total_rewards.fill(0.0);
        self.terminated.fill(false);
        self.truncated.fill(false);
        self.finished.fill(false);
        self.info_stats.clear();
        self.steps = 0;
        self.state = SimulatorState::Idle;
        self.rng = seeded_rng(self.config.seed);
        self.start_time = Instant::now();
        Ok(())
    }

    /// Advance one step. A finished simulator stays `Done`.
    ///
    /// A backend failure is returned as is; everything recorded up to the
    /// previous step stays readable.
    pub fn step(&mut self) -> Result<SimulatorState> {
        if self.state.is_done() {
            return Ok(self.state);
        }
        if self.steps >= self.config.num_steps {
            return Ok(self.finish(Termination::BudgetExhausted));
        }
        if self.state == SimulatorState::Idle {
            tracing::info!(
                agents = self.num_agents,
                budget = self.config.num_steps,
                seed = self.config.seed,
                "simulation started"
            );
            self.state = SimulatorState::Stepping;
        }

        let observations = self.observations.to_tensor(self.policy.device())?;
        let inference = self
            .policy
            .infer(&observations, self.recurrent_state.as_ref(), &mut self.rng)?;
        let result = self.backend.step(&inference.actions)?;
        self.check_result(&result)?;

        for (total, &reward) in self.total_rewards.iter_mut().zip(&result.rewards) {
            *total += reward;
        }
        for (i, finished) in self.finished.iter_mut().enumerate() {
            *finished |= result.terminated[i] || result.truncated[i];
        }
        for info in &result.infos {
            self.info_stats.record(info);
        }

        let VecEnvResult {
            observations,
            rewards,
            terminated,
            truncated,
            infos,
        } = result;
        self.observations = observations;
        self.rewards = rewards;
        self.terminated = terminated;
        self.truncated = truncated;
        self.infos = infos;
        self.recurrent_state = Some(inference.state);
        self.logits = Some(inference.logits);
        self.steps += 1;

        tracing::debug!(
            step = self.steps,
            finished = self.num_finished(),
            "simulator step"
        );

        if self.config.log_interval > 0 && self.steps % self.config.log_interval == 0 {
            self.log_stats();
        }

        if self.finished.iter().all(|&f| f) {
            Ok(self.finish(Termination::AllFinished))
        } else if self.steps >= self.config.num_steps {
            Ok(self.finish(Termination::BudgetExhausted))
        } else {
            Ok(self.state)
        }
    }

    /// Step until `Done`
    pub fn run(&mut self) -> Result<Termination> {
        loop {
            if let SimulatorState::Done(termination) = self.step()? {
                return Ok(termination);
            }
        }
    }

    fn finish(&mut self, termination: Termination) -> SimulatorState {
        self.state = SimulatorState::Done(termination);
        let stats = self.stats();
        tracing::info!(
            steps = %abbreviate(self.steps as u64),
            finished = stats.finished,
            mean_reward = stats.mean_reward(),
            elapsed = %format_duration(self.start_time.elapsed().as_secs_f64()),
            ?termination,
            "simulation finished"
        );
        self.log_stats();
        if let Some(logger) = &self.logger {
            logger.close();
        }
        self.state
    }

    fn log_stats(&self) {
        if let Some(logger) = &self.logger {
            logger.log_metrics(&self.stats().to_metrics(), self.steps as u64);
        }
    }

    fn check_result(&self, result: &VecEnvResult) -> Result<()> {
        let n = self.num_agents;
        check_batch("observations", n, result.observations.batch_size())?;
        check_batch("rewards", n, result.rewards.len())?;
        check_batch("terminated", n, result.terminated.len())?;
        check_batch("truncated", n, result.truncated.len())?;
        check_batch("infos", n, result.infos.len())
    }

    fn num_finished(&self) -> usize {
        self.finished.iter().filter(|&&f| f).count()
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn num_agents(&self) -> usize {
        self.num_agents
    }

    /// Sum of every reward batch so far, per agent
    pub fn total_rewards(&self) -> &[f32] {
        &self.total_rewards
    }

    /// Rewards of the last step
    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// `terminated` flags of the last step
    pub fn terminated(&self) -> &[bool] {
        &self.terminated
    }

    /// `truncated` flags of the last step
    pub fn truncated(&self) -> &[bool] {
        &self.truncated
    }

    /// Latched per-agent completion
    pub fn finished(&self) -> &[bool] {
        &self.finished
    }

    pub fn infos(&self) -> &[EnvInfo] {
        &self.infos
    }

    pub fn recurrent_state(&self) -> Option<&RecurrentState> {
        self.recurrent_state.as_ref()
    }

    pub fn observations(&self) -> &ObservationBatch {
        &self.observations
    }

    /// Action logits of the last step
    pub fn logits(&self) -> Option<&ActionLogits> {
        self.logits.as_ref()
    }

    /// Live entities of environment `env_index`
    pub fn grid_objects(&self, env_index: usize) -> Option<&[GridObject]> {
        self.backend.env(env_index).map(|env| env.grid_objects())
    }

    pub fn backend(&self) -> &V {
        &self.backend
    }

    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            steps: self.steps,
            total_rewards: self.total_rewards.clone(),
            finished: self.num_finished(),
            info: self.info_stats.means(),
        }
    }

    /// Close the backend and hand it back
    pub fn into_backend(mut self) -> V {
        self.backend.close();
        self.backend
    }
}

fn check_batch(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        tracing::warn!(what, expected, actual, "batch size diverged");
        return Err(MettaError::ShapeMismatch {
            expected: vec![expected],
            actual: vec![actual],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderConfig, PolicyConfig};
    use crate::env::{Action, MettaEnv, StepResult};
    use crate::policy::WeightTransforms;
    use crate::spaces::{Box as BoxSpace, Discrete, DynSpace};
    use crate::vector::Serial;
    use candle_core::Device;
    use ndarray::{ArrayD, IxDyn};

    /// Reward 1 per step; fails on `fail_at` when set.
    struct Counter {
        t: usize,
        fail_at: Option<usize>,
    }

    impl MettaEnv for Counter {
        fn observation_space(&self) -> DynSpace {
            DynSpace::Box(BoxSpace::grid(1, 1, 1, 1.0))
        }

        fn action_space(&self) -> DynSpace {
            DynSpace::Discrete(Discrete::new(2))
        }

        fn reset(&mut self, _seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
            self.t = 0;
            Ok((ArrayD::zeros(IxDyn(&[1, 1, 1])), EnvInfo::new()))
        }

        fn step(&mut self, _action: Action) -> Result<StepResult> {
            self.t += 1;
            if self.fail_at == Some(self.t) {
                return Err(MettaError::EnvironmentStep(format!("counter broke at {}", self.t)));
            }
            Ok(StepResult {
                observation: ArrayD::zeros(IxDyn(&[1, 1, 1])),
                reward: 1.0,
                terminated: false,
                truncated: false,
                info: EnvInfo::new(),
            })
        }
    }

    fn policy() -> PolicyModule {
        PolicyModule::new(
            &DynSpace::Box(BoxSpace::grid(1, 1, 1, 1.0)),
            &DynSpace::Discrete(Discrete::new(2)),
            &[],
            &["bias".to_string()],
            &WeightTransforms::new(),
            PolicyConfig::default()
                .with_encoder(EncoderConfig {
                    output_size: 8,
                    ..Default::default()
                })
                .with_rnn_size(4),
            Device::Cpu,
        )
        .unwrap()
    }

    #[test]
    fn test_idle_after_construction() {
        let policy = policy();
        let backend = Serial::new(|| Counter { t: 0, fail_at: None }, 2);
        let sim = Simulator::new(SimulatorConfig::default(), &policy, backend).unwrap();
        assert_eq!(sim.state(), SimulatorState::Idle);
        assert!(sim.recurrent_state().is_none());
        assert_eq!(sim.total_rewards(), &[0.0, 0.0]);
        assert_eq!(sim.finished(), &[false, false]);
    }

    #[test]
    fn test_zero_budget_is_done_without_stepping() {
        let policy = policy();
        let backend = Serial::new(|| Counter { t: 0, fail_at: None }, 1);
        let config = SimulatorConfig::default().with_num_steps(0);
        let mut sim = Simulator::new(config, &policy, backend).unwrap();
        assert_eq!(sim.run().unwrap(), Termination::BudgetExhausted);
        assert_eq!(sim.steps(), 0);
    }

    #[test]
    fn test_step_failure_propagates_and_keeps_progress() {
        let policy = policy();
        let backend = Serial::from_envs(vec![
            Counter { t: 0, fail_at: None },
            Counter { t: 0, fail_at: Some(3) },
        ]);
        let mut sim = Simulator::new(SimulatorConfig::default(), &policy, backend).unwrap();
        let err = sim.run().unwrap_err();
        assert!(matches!(err, MettaError::EnvironmentStep(ref msg) if msg.contains("at 3")));
        assert_eq!(sim.steps(), 2);
        assert_eq!(sim.total_rewards(), &[2.0, 2.0]);
        assert!(!sim.state().is_done());
    }

    #[test]
    fn test_done_is_sticky() {
        let policy = policy();
        let backend = Serial::new(|| Counter { t: 0, fail_at: None }, 1);
        let config = SimulatorConfig::default().with_num_steps(3);
        let mut sim = Simulator::new(config, &policy, backend).unwrap();
        assert_eq!(sim.run().unwrap(), Termination::BudgetExhausted);
        assert_eq!(sim.step().unwrap(), SimulatorState::Done(Termination::BudgetExhausted));
        assert_eq!(sim.steps(), 3);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let policy = policy();
        let backend = Serial::new(|| Counter { t: 0, fail_at: None }, 2);
        let config = SimulatorConfig::default().with_num_steps(2);
        let mut sim = Simulator::new(config, &policy, backend).unwrap();
        sim.run().unwrap();
        sim.reset().unwrap();
        assert_eq!(sim.state(), SimulatorState::Idle);
        assert_eq!(sim.steps(), 0);
        assert_eq!(sim.total_rewards(), &[0.0, 0.0]);
        assert!(sim.recurrent_state().is_none());
    }

    #[test]
    fn test_recurrent_state_batch_checked() {
        let policy = policy();
        let backend = Serial::new(|| Counter { t: 0, fail_at: None }, 2);
        let sim = Simulator::new(SimulatorConfig::default(), &policy, backend).unwrap();
        let state = policy.initial_state(3).unwrap();
        assert!(matches!(
            sim.with_recurrent_state(state),
            Err(MettaError::ShapeMismatch { .. })
        ));
    }
}
