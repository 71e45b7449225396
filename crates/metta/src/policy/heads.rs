//! Action heads, conditioned on the action-space shape.

use super::hooks::KeyedTransform;
use super::init::LayerRecord;
use super::stack::LinearStack;
use super::store::ParamStore;
use super::Activation;
use crate::spaces::ActionSpaceDescriptor;
use crate::Result;
use candle_core::{Module, Tensor};

/// The action network(s) of a policy.
///
/// `Single` for `Discrete`, `Pair` for `MultiDiscrete2`. The two heads of a
/// pair share no parameters.
#[derive(Debug)]
pub enum ActionHeads {
    Single { type_head: LinearStack },
    Pair { type_head: LinearStack, param_head: LinearStack },
}

/// Raw head outputs for one batch
#[derive(Debug, Clone)]
pub enum ActionLogits {
    Single(Tensor),
    Pair { type_logits: Tensor, param_logits: Tensor },
}

impl ActionLogits {
    /// Type-head logits, `[N, n0]`
    pub fn type_logits(&self) -> &Tensor {
        match self {
            ActionLogits::Single(t) => t,
            ActionLogits::Pair { type_logits, .. } => type_logits,
        }
    }

    /// Parameter-head logits, `[N, n1]`, when there is a parameter head
    pub fn param_logits(&self) -> Option<&Tensor> {
        match self {
            ActionLogits::Single(_) => None,
            ActionLogits::Pair { param_logits, .. } => Some(param_logits),
        }
    }

    /// Same logits cut off from the op graph
    pub fn detach(&self) -> Self {
        match self {
            ActionLogits::Single(t) => ActionLogits::Single(t.detach()),
            ActionLogits::Pair {
                type_logits,
                param_logits,
            } => ActionLogits::Pair {
                type_logits: type_logits.detach(),
                param_logits: param_logits.detach(),
            },
        }
    }
}

impl ActionHeads {
    pub fn num_heads(&self) -> usize {
        match self {
            ActionHeads::Single { .. } => 1,
            ActionHeads::Pair { .. } => 2,
        }
    }

    pub fn type_head(&self) -> &LinearStack {
        match self {
            ActionHeads::Single { type_head } | ActionHeads::Pair { type_head, .. } => type_head,
        }
    }

    pub fn param_head(&self) -> Option<&LinearStack> {
        match self {
            ActionHeads::Single { .. } => None,
            ActionHeads::Pair { param_head, .. } => Some(param_head),
        }
    }

    /// Output width of every head, type head first
    pub fn output_sizes(&self) -> Vec<usize> {
        match self {
            ActionHeads::Single { type_head } => vec![type_head.output_size()],
            ActionHeads::Pair { type_head, param_head } => {
                vec![type_head.output_size(), param_head.output_size()]
            }
        }
    }

    pub fn forward(&self, state: &Tensor) -> candle_core::Result<ActionLogits> {
        Ok(match self {
            ActionHeads::Single { type_head } => ActionLogits::Single(type_head.forward(state)?),
            ActionHeads::Pair { type_head, param_head } => ActionLogits::Pair {
                type_logits: type_head.forward(state)?,
                param_logits: param_head.forward(state)?,
            },
        })
    }
}

/// Builds [`ActionHeads`] on top of the decoded state.
pub struct ActionHeadBuilder<'a> {
    pub store: &'a ParamStore,
    pub hidden_sizes: &'a [usize],
    pub activation: Activation,
    pub transform: KeyedTransform<'a>,
}

impl ActionHeadBuilder<'_> {
    pub fn build(
        &self,
        decoded_state_size: usize,
        descriptor: &ActionSpaceDescriptor,
        registry: &mut Vec<LayerRecord>,
    ) -> Result<ActionHeads> {
        let head = |prefix: &str, n: usize, registry: &mut Vec<LayerRecord>| {
            LinearStack::new(
                self.store,
                prefix,
                decoded_state_size,
                n,
                self.hidden_sizes,
                self.activation,
                self.transform,
                registry,
            )
        };

        Ok(match *descriptor {
            ActionSpaceDescriptor::Discrete { n } => ActionHeads::Single {
                type_head: head("actor_type", n, registry)?,
            },
            ActionSpaceDescriptor::MultiDiscrete2 { n0, n1 } => ActionHeads::Pair {
                type_head: head("actor_type", n0, registry)?,
                param_head: head("actor_param", n1, registry)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::hooks::WeightTransforms;
    use candle_core::{DType, Device};

    fn build(descriptor: ActionSpaceDescriptor, hidden: &[usize]) -> (ActionHeads, Vec<LayerRecord>, ParamStore) {
        let store = ParamStore::new(Device::Cpu);
        let transforms = WeightTransforms::new();
        let mut registry = Vec::new();
        let heads = ActionHeadBuilder {
            store: &store,
            hidden_sizes: hidden,
            activation: Activation::ReLU,
            transform: transforms.key("actor"),
        }
        .build(12, &descriptor, &mut registry)
        .unwrap();
        (heads, registry, store)
    }

    #[test]
    fn test_discrete_single_head() {
        let (heads, registry, _) = build(ActionSpaceDescriptor::Discrete { n: 7 }, &[16]);
        assert_eq!(heads.num_heads(), 1);
        assert_eq!(heads.output_sizes(), vec![7]);
        assert!(heads.param_head().is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_multi_discrete_pair_heads_are_independent() {
        let (heads, registry, store) =
            build(ActionSpaceDescriptor::MultiDiscrete2 { n0: 3, n1: 10 }, &[]);
        assert_eq!(heads.num_heads(), 2);
        assert_eq!(heads.output_sizes(), vec![3, 10]);
        assert_eq!(registry.len(), 2);
        assert!(store.contains("actor_type.0.weight").unwrap());
        assert!(store.contains("actor_param.0.weight").unwrap());

        let x = Tensor::ones((4, 12), DType::F32, &Device::Cpu).unwrap();
        let logits = heads.forward(&x).unwrap();
        assert_eq!(logits.type_logits().dims(), &[4, 3]);
        assert_eq!(logits.param_logits().unwrap().dims(), &[4, 10]);
    }
}
