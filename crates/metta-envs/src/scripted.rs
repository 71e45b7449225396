//! Environment that plays back a fixed schedule.

use metta::env::{Action, EnvInfo, MettaEnv, StepResult};
use metta::spaces::{Box as BoxSpace, Discrete, DynSpace};
use metta::{MettaError, Result};
use ndarray::{ArrayD, IxDyn};

/// Ignores its actions and follows a script: the reward for step `t` is
/// `rewards[t - 1]` (zero past the end), it terminates at `done_at` and is
/// truncated at `truncated_at`. Steps count from 1 and restart on reset.
///
/// The observation is a single `[1, 1, 1]` cell holding the step count,
/// matching one global feature.
#[derive(Clone, Debug, Default)]
pub struct ScriptedEnv {
    rewards: Vec<f32>,
    done_at: Option<u32>,
    truncated_at: Option<u32>,
    fail_at: Option<u32>,
    tick: u32,
    finished: bool,
    last_action: Option<Action>,
}

impl ScriptedEnv {
    /// Never ends on its own and pays nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-step rewards
    pub fn with_rewards(mut self, rewards: Vec<f32>) -> Self {
        self.rewards = rewards;
        self
    }

    /// Report `terminated` on this step
    pub fn done_at(mut self, step: u32) -> Self {
        self.done_at = Some(step);
        self
    }

    /// Report `truncated` on this step
    pub fn truncated_at(mut self, step: u32) -> Self {
        self.truncated_at = Some(step);
        self
    }

    /// Fail with [`MettaError::EnvironmentStep`] on this step
    pub fn fail_at(mut self, step: u32) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Feature name of the single observation channel
    pub fn global_features() -> Vec<String> {
        vec!["tick".to_string()]
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn last_action(&self) -> Option<Action> {
        self.last_action
    }

    fn observe(&self) -> ArrayD<f32> {
        ArrayD::from_elem(IxDyn(&[1, 1, 1]), self.tick as f32)
    }
}

impl MettaEnv for ScriptedEnv {
    fn observation_space(&self) -> DynSpace {
        DynSpace::Box(BoxSpace::grid(1, 1, 1, f32::MAX))
    }

    fn action_space(&self) -> DynSpace {
        DynSpace::Discrete(Discrete::new(2))
    }

    fn reset(&mut self, _seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        self.tick = 0;
        self.finished = false;
        Ok((self.observe(), EnvInfo::new()))
    }

    fn step(&mut self, action: Action) -> Result<StepResult> {
        self.tick += 1;
        self.last_action = Some(action);
        if self.fail_at == Some(self.tick) {
            return Err(MettaError::EnvironmentStep(format!(
                "scripted failure at step {}",
                self.tick
            )));
        }

        let reward = self
            .rewards
            .get(self.tick as usize - 1)
            .copied()
            .unwrap_or(0.0);
        let terminated = self.done_at == Some(self.tick);
        let truncated = self.truncated_at == Some(self.tick);
        self.finished = terminated || truncated;

        Ok(StepResult {
            observation: self.observe(),
            reward,
            terminated,
            truncated,
            info: EnvInfo::new().with_extra("tick", self.tick as f32),
        })
    }

    fn is_done(&self) -> bool {
        self.finished
    }
}

/// Several scripted agents sharing one instance.
///
/// Agent `i` follows the script of `agents[i]`. An agent whose episode has
/// ended idles with zero reward until every agent has ended, at which point
/// the instance is done and the next backend step resets it.
#[derive(Clone, Debug)]
pub struct ScriptedSquad {
    agents: Vec<ScriptedEnv>,
}

impl ScriptedSquad {
    pub fn new(agents: Vec<ScriptedEnv>) -> Self {
        assert!(!agents.is_empty(), "a squad needs at least one agent");
        Self { agents }
    }

    pub fn agents(&self) -> &[ScriptedEnv] {
        &self.agents
    }
}

impl MettaEnv for ScriptedSquad {
    fn observation_space(&self) -> DynSpace {
        self.agents[0].observation_space()
    }

    fn action_space(&self) -> DynSpace {
        self.agents[0].action_space()
    }

    /// Resets every agent and returns the first agent's row
    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        let mut rows = self.multi_reset(seed)?;
        Ok(rows.swap_remove(0))
    }

    /// Only valid for a squad of one
    fn step(&mut self, action: Action) -> Result<StepResult> {
        let mut rows = self.multi_step(&[action])?;
        Ok(rows.swap_remove(0))
    }

    fn num_agents(&self) -> usize {
        self.agents.len()
    }

    fn multi_reset(&mut self, seed: Option<u64>) -> Result<Vec<(ArrayD<f32>, EnvInfo)>> {
        self.agents.iter_mut().map(|agent| agent.reset(seed)).collect()
    }

    fn multi_step(&mut self, actions: &[Action]) -> Result<Vec<StepResult>> {
        if actions.len() != self.agents.len() {
            return Err(MettaError::ShapeMismatch {
                expected: vec![self.agents.len()],
                actual: vec![actions.len()],
            });
        }
        self.agents
            .iter_mut()
            .zip(actions)
            .map(|(agent, &action)| {
                if agent.is_done() {
                    Ok(StepResult {
                        observation: agent.observe(),
                        reward: 0.0,
                        terminated: false,
                        truncated: false,
                        info: EnvInfo::new(),
                    })
                } else {
                    agent.step(action)
                }
            })
            .collect()
    }

    fn is_done(&self) -> bool {
        self.agents.iter().all(|agent| agent.is_done())
    }
}
