//! Decoder between the core output and the critic/action heads.

use super::hooks::KeyedTransform;
use super::init::LayerRecord;
use super::stack::LinearStack;
use super::store::ParamStore;
use crate::config::DecoderConfig;
use crate::Result;
use candle_core::{Module, Tensor};

/// Identity when configured without layers, otherwise an MLP with the
/// activation after every layer.
pub struct Decoder {
    stack: Option<LinearStack>,
    config: DecoderConfig,
    out_size: usize,
}

impl Decoder {
    pub fn new(
        store: &ParamStore,
        input_size: usize,
        config: &DecoderConfig,
        transform: KeyedTransform<'_>,
        registry: &mut Vec<LayerRecord>,
    ) -> Result<Self> {
        let stack = match config.hidden_sizes.split_last() {
            None => None,
            Some((&out, hidden)) => Some(LinearStack::new(
                store,
                "decoder",
                input_size,
                out,
                hidden,
                config.activation,
                transform,
                registry,
            )?),
        };
        let out_size = stack.as_ref().map_or(input_size, |s| s.output_size());
        Ok(Self {
            stack,
            config: config.clone(),
            out_size,
        })
    }

    /// Width of the decoded state
    pub fn out_size(&self) -> usize {
        self.out_size
    }

    pub fn forward(&self, core_output: &Tensor) -> candle_core::Result<Tensor> {
        match &self.stack {
            None => Ok(core_output.clone()),
            Some(stack) => self.config.activation.apply(&stack.forward(core_output)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::hooks::WeightTransforms;
    use crate::policy::Activation;
    use candle_core::{DType, Device};

    #[test]
    fn test_identity_decoder() {
        let store = ParamStore::new(Device::Cpu);
        let transforms = WeightTransforms::new();
        let mut registry = Vec::new();
        let decoder = Decoder::new(
            &store,
            8,
            &DecoderConfig::default(),
            transforms.key("decoder"),
            &mut registry,
        )
        .unwrap();
        assert_eq!(decoder.out_size(), 8);
        assert!(registry.is_empty());
        let x = Tensor::ones((2, 8), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(decoder.forward(&x).unwrap().dims(), &[2, 8]);
    }

    #[test]
    fn test_mlp_decoder_output_size() {
        let store = ParamStore::new(Device::Cpu);
        let transforms = WeightTransforms::new();
        let mut registry = Vec::new();
        let config = DecoderConfig {
            hidden_sizes: vec![16, 12],
            activation: Activation::Elu,
        };
        let decoder =
            Decoder::new(&store, 8, &config, transforms.key("decoder"), &mut registry).unwrap();
        assert_eq!(decoder.out_size(), 12);
        assert_eq!(registry.len(), 2);
        let x = Tensor::ones((3, 8), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(decoder.forward(&x).unwrap().dims(), &[3, 12]);
    }
}
