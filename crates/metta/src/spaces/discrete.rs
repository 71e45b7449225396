//! Integer-valued spaces: `Discrete` and `MultiDiscrete`.

use super::Space;
use crate::{MettaError, Result};
use rand::Rng;
use std::fmt;

/// Discrete space with n possible values: {0, 1, ..., n-1}
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discrete {
    /// Number of possible values
    pub n: usize,
    shape: [usize; 1],
}

impl Discrete {
    /// Create a new discrete space with n values.
    ///
    /// # Panics
    /// If `n` is zero. Use [`Discrete::try_new`] for untrusted input.
    pub fn new(n: usize) -> Self {
        Self::try_new(n).expect("Discrete space must have at least 1 element")
    }

    pub fn try_new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(MettaError::InvalidConfig(
                "Discrete space must have at least 1 element".into(),
            ));
        }
        Ok(Self { n, shape: [1] })
    }
}

impl Space for Discrete {
    type Sample = usize;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.n)
    }

    fn contains(&self, value: &usize) -> bool {
        *value < self.n
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn num_elements(&self) -> usize {
        1
    }
}

impl fmt::Display for Discrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Discrete({})", self.n)
    }
}

/// Several independent discrete dimensions; dimension i has `nvec[i]` values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiDiscrete {
    /// Number of values for each dimension
    pub nvec: Vec<usize>,
    shape: [usize; 1],
}

impl MultiDiscrete {
    /// Create a new multi-discrete space.
    ///
    /// # Panics
    /// If `nvec` is empty or any entry is zero.
    pub fn new(nvec: Vec<usize>) -> Self {
        Self::try_new(nvec).expect("MultiDiscrete dimensions must be non-empty and positive")
    }

    pub fn try_new(nvec: Vec<usize>) -> Result<Self> {
        if nvec.is_empty() || nvec.contains(&0) {
            return Err(MettaError::InvalidConfig(format!(
                "MultiDiscrete dimensions must be non-empty and positive, got {nvec:?}"
            )));
        }
        let shape = [nvec.len()];
        Ok(Self { nvec, shape })
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.nvec.len()
    }
}

impl Space for MultiDiscrete {
    type Sample = Vec<usize>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        self.nvec.iter().map(|&n| rng.gen_range(0..n)).collect()
    }

    fn contains(&self, value: &Vec<usize>) -> bool {
        value.len() == self.nvec.len() && value.iter().zip(&self.nvec).all(|(&v, &n)| v < n)
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl fmt::Display for MultiDiscrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MultiDiscrete({:?})", self.nvec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_discrete_sample_in_range() {
        let space = Discrete::new(4);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            assert!(space.contains(&space.sample(&mut rng)));
        }
    }

    #[test]
    fn test_discrete_rejects_zero() {
        assert!(matches!(
            Discrete::try_new(0),
            Err(MettaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_multi_discrete_contains() {
        let space = MultiDiscrete::new(vec![3, 4]);
        assert!(space.contains(&vec![2, 3]));
        assert!(!space.contains(&vec![3, 0]));
        assert!(!space.contains(&vec![0]));
        assert_eq!(space.ndim(), 2);
        assert_eq!(space.shape(), &[2]);
    }

    #[test]
    fn test_multi_discrete_rejects_zero_dimension() {
        assert!(MultiDiscrete::try_new(vec![3, 0]).is_err());
        assert!(MultiDiscrete::try_new(vec![]).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Discrete::new(5).to_string(), "Discrete(5)");
        assert_eq!(
            MultiDiscrete::new(vec![3, 4]).to_string(),
            "MultiDiscrete([3, 4])"
        );
    }
}
