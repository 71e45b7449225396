//! Environment wrappers.

use super::{Action, EnvInfo, GridObject, MettaEnv, StepResult};
use crate::spaces::DynSpace;
use crate::Result;
use ndarray::ArrayD;

/// Adds `episode_return` and `episode_length` to the info of the step that
/// ends an episode. Wraps single-agent environments; a multi-agent inner
/// environment rejects the single action this forwards.
pub struct EpisodeStats<E: MettaEnv> {
    env: E,
    episode_return: f32,
    episode_length: u32,
}

impl<E: MettaEnv> EpisodeStats<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode_return: 0.0,
            episode_length: 0,
        }
    }

    pub fn inner(&self) -> &E {
        &self.env
    }

    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E: MettaEnv> MettaEnv for EpisodeStats<E> {
    fn observation_space(&self) -> DynSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> DynSpace {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        self.episode_return = 0.0;
        self.episode_length = 0;
        self.env.reset(seed)
    }

    fn step(&mut self, action: Action) -> Result<StepResult> {
        let mut result = self.env.step(action)?;
        self.episode_return += result.reward;
        self.episode_length += 1;

        if result.done() {
            result.info = result
                .info
                .with_episode_stats(self.episode_return, self.episode_length);
            self.episode_return = 0.0;
            self.episode_length = 0;
        }
        Ok(result)
    }

    fn grid_objects(&self) -> &[GridObject] {
        self.env.grid_objects()
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }

    fn is_done(&self) -> bool {
        self.env.is_done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::{Box as BoxSpace, Discrete};
    use ndarray::IxDyn;

    struct FiveSteps {
        count: u32,
    }

    impl MettaEnv for FiveSteps {
        fn observation_space(&self) -> DynSpace {
            DynSpace::Box(BoxSpace::grid(1, 1, 1, 1.0))
        }

        fn action_space(&self) -> DynSpace {
            DynSpace::Discrete(Discrete::new(2))
        }

        fn reset(&mut self, _seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
            self.count = 0;
            Ok((ArrayD::zeros(IxDyn(&[1, 1, 1])), EnvInfo::new()))
        }

        fn step(&mut self, _action: Action) -> Result<StepResult> {
            self.count += 1;
            Ok(StepResult {
                observation: ArrayD::zeros(IxDyn(&[1, 1, 1])),
                reward: 1.0,
                terminated: self.count >= 5,
                truncated: false,
                info: EnvInfo::new(),
            })
        }
    }

    #[test]
    fn test_episode_stats_on_final_step() {
        let mut wrapped = EpisodeStats::new(FiveSteps { count: 0 });
        wrapped.reset(None).unwrap();

        for _ in 0..4 {
            let result = wrapped.step(Action::Discrete(0)).unwrap();
            assert!(!result.done());
            assert!(result.info.get("episode_return").is_none());
        }

        let result = wrapped.step(Action::Discrete(0)).unwrap();
        assert!(result.done());
        assert_eq!(result.info.get("episode_return"), Some(5.0));
        assert_eq!(result.info.get("episode_length"), Some(5.0));
    }
}
