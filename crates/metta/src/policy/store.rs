//! Parameter storage shared by every sub-module of a policy.

use crate::{MettaError, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use std::path::Path;

/// Owns all trainable variables of a policy.
///
/// Layers hold tensors that share storage with the variables here, so
/// [`ParamStore::assign`] is visible to every layer built from the store.
pub struct ParamStore {
    varmap: VarMap,
    device: Device,
}

impl ParamStore {
    pub fn new(device: Device) -> Self {
        Self {
            varmap: VarMap::new(),
            device,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Builder rooted at `prefix`
    pub fn builder(&self, prefix: &str) -> VarBuilder<'static> {
        VarBuilder::from_varmap(&self.varmap, DType::F32, &self.device).pp(prefix)
    }

    /// Look up a variable by its full dotted name
    pub fn get(&self, name: &str) -> Result<Tensor> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| MettaError::InvalidConfig("parameter store lock poisoned".into()))?;
        data.get(name)
            .map(|v| v.as_tensor().clone())
            .ok_or_else(|| MettaError::MissingParameter(name.to_string()))
    }

    /// Whether a variable with this name exists
    pub fn contains(&self, name: &str) -> Result<bool> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| MettaError::InvalidConfig("parameter store lock poisoned".into()))?;
        Ok(data.contains_key(name))
    }

    /// Overwrite a variable in place. The shape must not change.
    pub fn assign(&self, name: &str, value: &Tensor) -> Result<()> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| MettaError::InvalidConfig("parameter store lock poisoned".into()))?;
        let var = data
            .get(name)
            .ok_or_else(|| MettaError::MissingParameter(name.to_string()))?;
        if var.dims() != value.dims() {
            return Err(MettaError::ShapeMismatch {
                expected: var.dims().to_vec(),
                actual: value.dims().to_vec(),
            });
        }
        // A transform may hand back a view of the variable itself.
        let value = value.to_dtype(DType::F32)?.to_device(&self.device)?.copy()?;
        var.set(&value)?;
        Ok(())
    }

    /// Total number of scalar parameters
    pub fn num_parameters(&self) -> usize {
        self.varmap.all_vars().iter().map(|v| v.elem_count()).sum()
    }

    /// Save to a safetensors file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.varmap.save(path)?;
        Ok(())
    }

    /// Load from a safetensors file written by [`ParamStore::save`]
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.varmap.load(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::Init;

    #[test]
    fn test_assign_replaces_values_seen_by_layers() {
        let store = ParamStore::new(Device::Cpu);
        let w = store
            .builder("layer")
            .get_with_hints((2, 3), "weight", Init::Const(1.0))
            .unwrap();
        store
            .assign("layer.weight", &Tensor::zeros((2, 3), DType::F32, &Device::Cpu).unwrap())
            .unwrap();
        let sum = w.sum_all().unwrap().to_scalar::<f32>().unwrap();
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn test_assign_rejects_shape_change() {
        let store = ParamStore::new(Device::Cpu);
        store
            .builder("layer")
            .get_with_hints((2, 3), "weight", Init::Const(1.0))
            .unwrap();
        let err = store.assign(
            "layer.weight",
            &Tensor::zeros((3, 2), DType::F32, &Device::Cpu).unwrap(),
        );
        assert!(matches!(err, Err(MettaError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let store = ParamStore::new(Device::Cpu);
        store
            .builder("layer")
            .get_with_hints((2, 2), "bias", Init::Const(1.0))
            .unwrap();
        assert!(store.contains("layer.bias").unwrap());
        assert!(!store.contains("layer.weight").unwrap());

        let varmap = store.varmap.clone();
        let _ = std::thread::spawn(move || {
            let _guard = varmap.data().lock().unwrap();
            panic!("poison the parameter lock");
        })
        .join();

        assert!(matches!(store.contains("layer.bias"), Err(MettaError::InvalidConfig(_))));
        assert!(matches!(store.get("layer.bias"), Err(MettaError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_parameter() {
        let store = ParamStore::new(Device::Cpu);
        assert!(matches!(
            store.get("nope.weight"),
            Err(MettaError::MissingParameter(_))
        ));
    }
}
