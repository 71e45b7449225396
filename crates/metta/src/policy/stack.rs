//! Fully connected stacks used by the decoder, critic and action heads.

use super::hooks::KeyedTransform;
use super::init::{LayerKind, LayerRecord};
use super::store::ParamStore;
use super::Activation;
use crate::{MettaError, Result};
use candle_core::{Module, Tensor};
use candle_nn::Linear;

/// `input -> hidden_1 -> ... -> hidden_k -> output`, with the activation
/// between layers and none after the last one.
#[derive(Debug)]
pub struct LinearStack {
    layers: Vec<Linear>,
    activation: Activation,
    input_size: usize,
    output_size: usize,
}

impl LinearStack {
    /// Build the stack under `prefix`, passing every weight through `transform`
    /// and recording every layer in `registry`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &ParamStore,
        prefix: &str,
        input_size: usize,
        output_size: usize,
        hidden_sizes: &[usize],
        activation: Activation,
        transform: KeyedTransform<'_>,
        registry: &mut Vec<LayerRecord>,
    ) -> Result<Self> {
        let mut sizes = Vec::with_capacity(hidden_sizes.len() + 2);
        sizes.push(input_size);
        sizes.extend_from_slice(hidden_sizes);
        sizes.push(output_size);
        if sizes.contains(&0) {
            return Err(MettaError::InvalidConfig(format!(
                "{prefix}: layer widths must be positive, got {sizes:?}"
            )));
        }

        let root = store.builder(prefix);
        let mut layers = Vec::with_capacity(sizes.len() - 1);
        for (i, pair) in sizes.windows(2).enumerate() {
            let layer = candle_nn::linear(pair[0], pair[1], root.pp(i))?;
            let name = format!("{prefix}.{i}");
            if let Some(weight) = transform.apply(layer.weight())? {
                tracing::debug!(layer = %name, key = transform.name(), "transformed weight");
                store.assign(&format!("{name}.weight"), &weight)?;
            }
            registry.push(LayerRecord::new(name, LayerKind::Linear));
            layers.push(layer);
        }

        Ok(Self {
            layers,
            activation,
            input_size,
            output_size,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Linear] {
        &self.layers
    }
}

impl Module for LinearStack {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let last = self.layers.len() - 1;
        let mut x = xs.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x)?;
            if i < last {
                x = self.activation.apply(&x)?;
            }
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::hooks::WeightTransforms;
    use candle_core::{DType, Device};

    #[test]
    fn test_stack_shapes() {
        let store = ParamStore::new(Device::Cpu);
        let mut registry = Vec::new();
        let transforms = WeightTransforms::new();
        let stack = LinearStack::new(
            &store,
            "critic",
            16,
            1,
            &[32, 8],
            Activation::ReLU,
            transforms.key("critic"),
            &mut registry,
        )
        .unwrap();

        assert_eq!(stack.num_layers(), 3);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry[2].name, "critic.2");
        let x = Tensor::ones((5, 16), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(stack.forward(&x).unwrap().dims(), &[5, 1]);
    }

    #[test]
    fn test_empty_hidden_is_single_projection() {
        let store = ParamStore::new(Device::Cpu);
        let mut registry = Vec::new();
        let transforms = WeightTransforms::new();
        let stack = LinearStack::new(
            &store,
            "actor",
            4,
            3,
            &[],
            Activation::Tanh,
            transforms.key("actor"),
            &mut registry,
        )
        .unwrap();
        assert_eq!(stack.num_layers(), 1);
        assert_eq!(stack.layers()[0].weight().dims(), &[3, 4]);
    }

    #[test]
    fn test_transform_replaces_stored_weight() {
        let store = ParamStore::new(Device::Cpu);
        let mut registry = Vec::new();
        let transforms = WeightTransforms::new().with("actor", |w| w.ones_like());
        let stack = LinearStack::new(
            &store,
            "actor",
            2,
            2,
            &[],
            Activation::ReLU,
            transforms.key("actor"),
            &mut registry,
        )
        .unwrap();
        let stored = store.get("actor.0.weight").unwrap();
        assert_eq!(stored.sum_all().unwrap().to_scalar::<f32>().unwrap(), 4.0);
        let used = stack.layers()[0].weight();
        assert_eq!(used.sum_all().unwrap().to_scalar::<f32>().unwrap(), 4.0);
    }

    #[test]
    fn test_zero_width_rejected() {
        let store = ParamStore::new(Device::Cpu);
        let mut registry = Vec::new();
        let transforms = WeightTransforms::new();
        let err = LinearStack::new(
            &store,
            "actor",
            4,
            0,
            &[],
            Activation::ReLU,
            transforms.key("actor"),
            &mut registry,
        );
        assert!(matches!(err, Err(MettaError::InvalidConfig(_))));
        assert!(registry.is_empty());
    }
}
