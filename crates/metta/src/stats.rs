//! Read-only statistics for a simulation run.

use crate::env::EnvInfo;

/// Snapshot of a simulator's progress, produced by
/// [`crate::simulator::Simulator::stats`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationStats {
    pub steps: usize,
    /// Cumulative reward per agent
    pub total_rewards: Vec<f32>,
    /// Agents that have terminated or been truncated at least once
    pub finished: usize,
    /// Mean of every numeric info metric seen so far, in first-seen order
    pub info: Vec<(String, f64)>,
}

impl SimulationStats {
    pub fn num_agents(&self) -> usize {
        self.total_rewards.len()
    }

    pub fn mean_reward(&self) -> f64 {
        if self.total_rewards.is_empty() {
            return 0.0;
        }
        self.total_rewards.iter().map(|&r| r as f64).sum::<f64>() / self.total_rewards.len() as f64
    }

    pub fn min_reward(&self) -> f64 {
        self.total_rewards
            .iter()
            .map(|&r| r as f64)
            .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.min(r))))
            .unwrap_or(0.0)
    }

    pub fn max_reward(&self) -> f64 {
        self.total_rewards
            .iter()
            .map(|&r| r as f64)
            .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.max(r))))
            .unwrap_or(0.0)
    }

    /// All metrics, fixed ones first, then info metrics
    pub fn to_metrics(&self) -> Vec<(String, f64)> {
        let mut metrics = vec![
            ("steps".to_string(), self.steps as f64),
            ("reward/mean".to_string(), self.mean_reward()),
            ("reward/min".to_string(), self.min_reward()),
            ("reward/max".to_string(), self.max_reward()),
            ("finished".to_string(), self.finished as f64),
        ];
        metrics.extend(self.info.iter().cloned());
        metrics
    }

    /// Up to `max_stats` info metrics for display, skipping values that are not
    /// finite numbers.
    pub fn user_stats(&self, max_stats: usize) -> Vec<(&str, f64)> {
        self.info
            .iter()
            .filter(|(_, value)| value.is_finite())
            .take(max_stats)
            .map(|(name, value)| (name.as_str(), *value))
            .collect()
    }
}

/// Running means of the numeric metrics environments report in their infos.
#[derive(Clone, Debug, Default)]
pub(crate) struct InfoAccumulator {
    entries: Vec<(&'static str, f64, usize)>,
}

impl InfoAccumulator {
    pub fn record(&mut self, info: &EnvInfo) {
        for (key, value) in info.metrics() {
            match self.entries.iter_mut().find(|(k, _, _)| *k == key) {
                Some((_, sum, count)) => {
                    *sum += value as f64;
                    *count += 1;
                }
                None => self.entries.push((key, value as f64, 1)),
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn means(&self) -> Vec<(String, f64)> {
        self.entries
            .iter()
            .map(|&(key, sum, count)| (key.to_string(), sum / count as f64))
            .collect()
    }
}
