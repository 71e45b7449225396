//! Categorical action distribution over head logits.

use crate::{MettaError, Result};
use candle_core::{Tensor, D};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Categorical distribution for a batch, one row of logits per instance.
#[derive(Clone, Debug)]
pub struct Categorical {
    logits: Tensor,
}

impl Categorical {
    /// `logits` is `[N, n]`
    pub fn new(logits: Tensor) -> Self {
        Self { logits }
    }

    pub fn logits(&self) -> &Tensor {
        &self.logits
    }

    pub fn probs(&self) -> Result<Tensor> {
        Ok(candle_nn::ops::softmax(&self.logits, D::Minus1)?)
    }

    /// Draw one action per row. All randomness comes from `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<i64>> {
        self.probs()?
            .to_vec2::<f32>()?
            .iter()
            .map(|row| {
                let dist = WeightedIndex::new(row)
                    .map_err(|e| MettaError::Sampling(format!("{e} for probabilities {row:?}")))?;
                Ok(dist.sample(rng) as i64)
            })
            .collect()
    }

    /// Most likely action per row
    pub fn mode(&self) -> Result<Vec<i64>> {
        Ok(self
            .logits
            .argmax(D::Minus1)?
            .to_vec1::<u32>()?
            .into_iter()
            .map(i64::from)
            .collect())
    }

    /// Log-probability of `actions[i]` under row i, `[N]`
    pub fn log_prob(&self, actions: &[i64]) -> Result<Tensor> {
        let (batch, n) = self.logits.dims2()?;
        if actions.len() != batch {
            return Err(MettaError::ShapeMismatch {
                expected: vec![batch],
                actual: vec![actions.len()],
            });
        }
        let indices = actions
            .iter()
            .map(|&a| {
                u32::try_from(a)
                    .ok()
                    .filter(|&a| (a as usize) < n)
                    .ok_or_else(|| MettaError::Sampling(format!("action {a} outside 0..{n}")))
            })
            .collect::<Result<Vec<u32>>>()?;
        let indices = Tensor::from_vec(indices, (batch, 1), self.logits.device())?;
        let log_probs = candle_nn::ops::log_softmax(&self.logits, D::Minus1)?;
        Ok(log_probs.gather(&indices, 1)?.squeeze(1)?)
    }

    /// Entropy per row, `[N]`
    pub fn entropy(&self) -> Result<Tensor> {
        let probs = self.probs()?;
        let log_probs = candle_nn::ops::log_softmax(&self.logits, D::Minus1)?;
        Ok((probs * log_probs)?.sum(D::Minus1)?.neg()?)
    }
}
