//! Nonlinearities selectable by name.

use crate::MettaError;
use candle_core::Tensor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nonlinearity placed between the layers of a stack.
///
/// Resolved by name against a fixed set (`"ReLU"`, `"Tanh"`, ...).
/// Matching is case-insensitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Activation {
    #[default]
    ReLU,
    Tanh,
    Gelu,
    Elu,
    Sigmoid,
    LeakyReLU,
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Activation::ReLU => "ReLU",
            Activation::Tanh => "Tanh",
            Activation::Gelu => "GELU",
            Activation::Elu => "ELU",
            Activation::Sigmoid => "Sigmoid",
            Activation::LeakyReLU => "LeakyReLU",
        }
    }

    /// Apply elementwise
    pub fn apply(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Activation::ReLU => x.relu(),
            Activation::Tanh => x.tanh(),
            Activation::Gelu => x.gelu(),
            Activation::Elu => x.elu(1.0),
            Activation::Sigmoid => candle_nn::ops::sigmoid(x),
            Activation::LeakyReLU => candle_nn::ops::leaky_relu(x, 0.01),
        }
    }
}

impl FromStr for Activation {
    type Err = MettaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::ReLU),
            "tanh" => Ok(Activation::Tanh),
            "gelu" => Ok(Activation::Gelu),
            "elu" => Ok(Activation::Elu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "leakyrelu" | "leaky_relu" => Ok(Activation::LeakyReLU),
            _ => Err(MettaError::UnknownActivation(s.to_string())),
        }
    }
}

impl TryFrom<String> for Activation {
    type Error = MettaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Activation> for String {
    fn from(a: Activation) -> Self {
        a.name().to_string()
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_parse_known_names() {
        assert_eq!("ReLU".parse::<Activation>().unwrap(), Activation::ReLU);
        assert_eq!("tanh".parse::<Activation>().unwrap(), Activation::Tanh);
        assert_eq!("LeakyReLU".parse::<Activation>().unwrap(), Activation::LeakyReLU);
        for a in [
            Activation::ReLU,
            Activation::Tanh,
            Activation::Gelu,
            Activation::Elu,
            Activation::Sigmoid,
            Activation::LeakyReLU,
        ] {
            assert_eq!(a.name().parse::<Activation>().unwrap(), a);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            "Softplus".parse::<Activation>(),
            Err(MettaError::UnknownActivation(name)) if name == "Softplus"
        ));
    }

    #[test]
    fn test_relu_apply() {
        let x = Tensor::new(&[-1.0f32, 0.5], &Device::Cpu).unwrap();
        let y = Activation::ReLU.apply(&x).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(y, vec![0.0, 0.5]);
    }
}
