//! Box (continuous) space. Grid observations are `[channels, height, width]`
//! boxes.

use super::Space;
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::fmt;

/// Box space for continuous values with elementwise bounds
#[derive(Clone, Debug, PartialEq)]
pub struct Box {
    /// Lower bound for each element
    pub low: ArrayD<f32>,
    /// Upper bound for each element
    pub high: ArrayD<f32>,
}

impl Box {
    /// Create a new box space with given bounds
    pub fn new(low: ArrayD<f32>, high: ArrayD<f32>) -> Self {
        assert_eq!(low.shape(), high.shape(), "Low and high must have same shape");
        Self { low, high }
    }

    /// Create a box space with the same bounds for every element
    pub fn uniform(shape: &[usize], low: f32, high: f32) -> Self {
        Self::new(
            ArrayD::from_elem(IxDyn(shape), low),
            ArrayD::from_elem(IxDyn(shape), high),
        )
    }

    /// A `[channels, height, width]` grid observation space with values in `[0, high]`
    pub fn grid(channels: usize, height: usize, width: usize, high: f32) -> Self {
        Self::uniform(&[channels, height, width], 0.0, high)
    }
}

impl Space for Box {
    type Sample = ArrayD<f32>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ArrayD<f32> {
        let mut result = ArrayD::zeros(self.low.raw_dim());
        for ((r, &l), &h) in result.iter_mut().zip(&self.low).zip(&self.high) {
            *r = if l < h { Uniform::new(l, h).sample(rng) } else { l };
        }
        result
    }

    fn contains(&self, value: &ArrayD<f32>) -> bool {
        value.shape() == self.low.shape()
            && value
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(&v, (&l, &h))| v >= l && v <= h)
    }

    fn shape(&self) -> &[usize] {
        self.low.shape()
    }
}

impl fmt::Display for Box {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Box({:?})", self.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_grid_shape() {
        let space = Box::grid(5, 7, 9, 1.0);
        assert_eq!(space.shape(), &[5, 7, 9]);
        assert_eq!(space.num_elements(), 5 * 7 * 9);
    }

    #[test]
    fn test_box_sample_is_contained() {
        let space = Box::uniform(&[3, 4], -1.0, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            assert!(space.contains(&space.sample(&mut rng)));
        }
    }

    #[test]
    fn test_box_contains_rejects_out_of_bounds() {
        let space = Box::uniform(&[2], 0.0, 1.0);
        let invalid = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.5, 0.5]).unwrap();
        assert!(!space.contains(&invalid));
    }
}
