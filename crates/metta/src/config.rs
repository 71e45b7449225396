//! Policy and simulator configuration.

use crate::policy::Activation;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Observation encoder: a conv stack over grid channels, then one projection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    /// Output channels of each conv layer
    pub conv_channels: Vec<usize>,
    /// Square kernel size shared by all conv layers
    pub kernel_size: usize,
    /// Stride shared by all conv layers
    pub stride: usize,
    /// Width of the encoded observation fed to the core
    pub output_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            conv_channels: vec![32, 64],
            kernel_size: 3,
            stride: 1,
            output_size: 128,
        }
    }
}

/// Recurrent core.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// LSTM hidden size
    pub rnn_size: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self { rnn_size: 128 }
    }
}

/// Decoder between the core output and the heads. Empty `hidden_sizes` is identity.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    pub hidden_sizes: Vec<usize>,
    pub activation: Activation,
}

/// A critic or actor head.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeadConfig {
    /// Hidden layer widths; empty means a single linear projection
    pub hidden_sizes: Vec<usize>,
    /// Nonlinearity between layers
    pub activation: Activation,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![64],
            activation: Activation::ReLU,
        }
    }
}

/// Configuration for [`crate::policy::PolicyModule`]
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    pub encoder: EncoderConfig,
    pub core: CoreConfig,
    pub decoder: DecoderConfig,
    pub actor: HeadConfig,
    pub critic: HeadConfig,
    /// Seed for the orthogonal conv initialization. Linear and LSTM layers
    /// keep candle's default initializers, which are not seeded.
    pub seed: u64,
}

impl PolicyConfig {
    /// Parse a single JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the LSTM hidden size
    pub fn with_rnn_size(mut self, rnn_size: usize) -> Self {
        self.core.rnn_size = rnn_size;
        self
    }

    /// Set actor hidden widths
    pub fn with_actor_hidden(mut self, hidden_sizes: Vec<usize>) -> Self {
        self.actor.hidden_sizes = hidden_sizes;
        self
    }

    /// Set critic hidden widths
    pub fn with_critic_hidden(mut self, hidden_sizes: Vec<usize>) -> Self {
        self.critic.hidden_sizes = hidden_sizes;
        self
    }

    /// Set the encoder
    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    /// Set the initialization seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Configuration for [`crate::simulator::Simulator`]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Step budget; reaching it ends the run
    pub num_steps: usize,
    /// Seed for environment reset and action sampling
    pub seed: u64,
    /// Emit stats to the metric logger every this many steps (0 = only at the end)
    pub log_interval: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            num_steps: 500,
            seed: 42,
            log_interval: 0,
        }
    }
}

impl SimulatorConfig {
    /// Set the step budget
    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the logging interval
    pub fn with_log_interval(mut self, log_interval: usize) -> Self {
        self.log_interval = log_interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulator_default_budget() {
        assert_eq!(SimulatorConfig::default().num_steps, 500);
    }

    #[test]
    fn test_policy_config_from_partial_json() {
        let cfg = PolicyConfig::from_json(
            r#"{ "core": { "rnn_size": 32 }, "actor": { "hidden_sizes": [], "activation": "Tanh" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.core.rnn_size, 32);
        assert!(cfg.actor.hidden_sizes.is_empty());
        assert_eq!(cfg.actor.activation, Activation::Tanh);
        assert_eq!(cfg.critic, HeadConfig::default());
        assert_eq!(cfg.encoder, EncoderConfig::default());
    }

    #[test]
    fn test_unknown_activation_is_rejected() {
        let err = PolicyConfig::from_json(r#"{ "critic": { "activation": "Swoosh" } }"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_builders() {
        let cfg = PolicyConfig::default()
            .with_rnn_size(16)
            .with_actor_hidden(vec![8, 8])
            .with_seed(3);
        assert_eq!(cfg.core.rnn_size, 16);
        assert_eq!(cfg.actor.hidden_sizes, vec![8, 8]);
        assert_eq!(cfg.seed, 3);
    }
}
