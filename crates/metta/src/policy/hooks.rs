//! Weight transforms keyed by sub-module name.
//!
//! A caller registers a transform under a name such as `"actor"` or
//! `"critic"`; every layer the policy builds under that name hands its fresh
//! weight to the transform, and the result replaces the weight before the
//! layer is used. This is how pretrained weights are spliced in or weights
//! are rescaled without touching construction code.

use candle_core::Tensor;
use std::collections::HashMap;
use std::fmt;

/// A weight transform: receives the freshly built weight, returns its replacement.
pub type TransformFn = Box<dyn Fn(&Tensor) -> candle_core::Result<Tensor> + Send + Sync>;

/// Explicit mapping from sub-module name to transform, passed into construction.
#[derive(Default)]
pub struct WeightTransforms {
    transforms: HashMap<String, TransformFn>,
}

impl WeightTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under `name`, replacing any previous one.
    pub fn with<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Tensor) -> candle_core::Result<Tensor> + Send + Sync + 'static,
    {
        self.insert(name, transform);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&Tensor) -> candle_core::Result<Tensor> + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Box::new(transform));
    }

    /// Transform for `name`; identity when nothing is registered.
    pub fn key<'a>(&'a self, name: &'a str) -> KeyedTransform<'a> {
        KeyedTransform {
            name,
            transform: self.transforms.get(name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }
}

impl fmt::Debug for WeightTransforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.transforms.keys().collect();
        keys.sort();
        f.debug_struct("WeightTransforms").field("keys", &keys).finish()
    }
}

/// The transform for one sub-module name.
#[derive(Clone, Copy)]
pub struct KeyedTransform<'a> {
    name: &'a str,
    transform: Option<&'a TransformFn>,
}

impl<'a> KeyedTransform<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Whether applying this transform can change anything
    pub fn is_identity(&self) -> bool {
        self.transform.is_none()
    }

    /// `None` for identity, so the caller can skip writing the weight back.
    pub fn apply(&self, weight: &Tensor) -> candle_core::Result<Option<Tensor>> {
        self.transform.map(|f| f(weight)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_missing_key_is_identity() {
        let transforms = WeightTransforms::new();
        let w = Tensor::ones((2, 2), DType::F32, &Device::Cpu).unwrap();
        let keyed = transforms.key("critic");
        assert!(keyed.is_identity());
        assert!(keyed.apply(&w).unwrap().is_none());
    }

    #[test]
    fn test_registered_key_transforms() {
        let transforms = WeightTransforms::new().with("actor", |w| w * 2.0);
        let w = Tensor::ones((2, 2), DType::F32, &Device::Cpu).unwrap();
        let out = transforms.key("actor").apply(&w).unwrap().unwrap();
        assert_eq!(out.sum_all().unwrap().to_scalar::<f32>().unwrap(), 8.0);
        assert!(transforms.key("critic").is_identity());
    }
}
