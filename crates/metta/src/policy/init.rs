//! Weight initialization, dispatched on a closed set of layer kinds.

use super::store::ParamStore;
use crate::Result;
use candle_core::Tensor;
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// Kind of a constructed layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Linear,
    Conv2d,
    Recurrent,
}

/// One entry in a policy's layer registry: the dotted parameter prefix and its kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerRecord {
    pub name: String,
    pub kind: LayerKind,
}

impl LayerRecord {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// What happens to a layer of a given kind
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InitScheme {
    /// Orthogonal weight with the given gain, bias zeroed
    Orthogonal { gain: f64 },
    /// Keep whatever the layer was built with
    Keep,
}

/// Applies [`InitScheme`]s over a layer registry.
///
/// Recurrent cells keep their own initialization: no scheme tried for them
/// did measurably better and the default is the safer choice.
#[derive(Clone, Debug)]
pub struct WeightInitializer {
    seed: u64,
}

impl WeightInitializer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn scheme(kind: LayerKind) -> InitScheme {
        match kind {
            LayerKind::Conv2d => InitScheme::Orthogonal { gain: 1.0 },
            LayerKind::Recurrent => InitScheme::Keep,
            LayerKind::Linear => InitScheme::Keep,
        }
    }

    /// Initialize every registered layer. Each layer draws from its own
    /// stream derived from the seed and its position, so applying the pass
    /// again yields the same weights.
    pub fn initialize(&self, store: &ParamStore, layers: &[LayerRecord]) -> Result<usize> {
        let mut touched = 0;
        for (index, layer) in layers.iter().enumerate() {
            match Self::scheme(layer.kind) {
                InitScheme::Keep => {}
                InitScheme::Orthogonal { gain } => {
                    let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(index as u64));
                    let weight_name = format!("{}.weight", layer.name);
                    let weight = store.get(&weight_name)?;
                    let dims = weight.dims().to_vec();
                    let rows = dims[0];
                    let cols: usize = dims[1..].iter().product();
                    let values = orthogonal(rows, cols, gain, &mut rng);
                    let init = Tensor::from_vec(values, dims, store.device())?;
                    store.assign(&weight_name, &init)?;

                    let bias_name = format!("{}.bias", layer.name);
                    if store.contains(&bias_name)? {
                        let bias = store.get(&bias_name)?;
                        store.assign(&bias_name, &bias.zeros_like()?)?;
                    }
                    touched += 1;
                }
            }
        }
        tracing::debug!(layers = layers.len(), touched, "initialized weights");
        Ok(touched)
    }
}

/// A `rows x cols` matrix (row-major) with orthonormal rows when
/// `rows <= cols` and orthonormal columns otherwise, scaled by `gain`.
///
/// Q factor of a Gaussian matrix, with each column's sign flipped to make the
/// diagonal of R positive.
pub fn orthogonal<R: rand::Rng + ?Sized>(rows: usize, cols: usize, gain: f64, rng: &mut R) -> Vec<f32> {
    let (tall, short) = if rows < cols { (cols, rows) } else { (rows, cols) };
    let gaussian = DMatrix::<f64>::from_fn(tall, short, |_, _| {
        <StandardNormal as Distribution<f64>>::sample(&StandardNormal, &mut *rng)
    });

    let qr = gaussian.qr();
    let r = qr.r();
    let mut q = qr.q();
    for j in 0..short {
        if r[(j, j)] < 0.0 {
            for v in q.column_mut(j).iter_mut() {
                *v = -*v;
            }
        }
    }

    let m = if rows < cols { q.transpose() } else { q };
    let mut out = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            out.push((gain * m[(i, j)]) as f32);
        }
    }
    out
}
