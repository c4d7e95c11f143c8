//! Weight initialization.
//!
//! Random initializers draw from a caller-provided RNG so that a seeded
//! network build is reproducible.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// Parameter initialization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Initializer {
    /// Glorot/Xavier uniform: `U(-l, l)` with `l = sqrt(6 / (fan_in + fan_out))`.
    #[default]
    GlorotUniform,
    /// He/Kaiming uniform: `U(-l, l)` with `l = sqrt(6 / fan_in)`.
    HeUniform,
    /// All zeros.
    Zeros,
    /// All ones.
    Ones,
    /// Constant value.
    Constant(f32),
}

impl Initializer {
    /// Creates a tensor of the given shape using this strategy.
    pub fn initialize<R: Rng + ?Sized>(&self, shape: &[usize], rng: &mut R) -> Tensor {
        match *self {
            Initializer::Zeros => Tensor::zeros(shape),
            Initializer::Ones => Tensor::ones(shape),
            Initializer::Constant(value) => Tensor::full(shape, value),
            Initializer::GlorotUniform => {
                let (fan_in, fan_out) = fan_in_out(shape);
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                Tensor::random_uniform(shape, -limit, limit, rng)
            }
            Initializer::HeUniform => {
                let (fan_in, _) = fan_in_out(shape);
                let limit = (6.0 / fan_in as f32).sqrt();
                Tensor::random_uniform(shape, -limit, limit, rng)
            }
        }
    }
}

fn fan_in_out(shape: &[usize]) -> (usize, usize) {
    if shape.len() >= 2 {
        (shape[0].max(1), shape[1].max(1))
    } else if shape.len() == 1 {
        let dim = shape[0].max(1);
        (dim, dim)
    } else {
        (1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_glorot_uniform_limit() {
        let mut rng = StdRng::seed_from_u64(42);
        let w = Initializer::GlorotUniform.initialize(&[17, 128], &mut rng);
        let limit = (6.0f32 / 145.0).sqrt();
        assert_eq!(w.shape(), &[17, 128]);
        assert!(w.data().iter().all(|v| v.abs() <= limit));
        assert!(w.data().iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_constant_initializers() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Initializer::Zeros.initialize(&[3], &mut rng).sum(), 0.0);
        assert_eq!(Initializer::Ones.initialize(&[3], &mut rng).sum(), 3.0);
        assert_eq!(
            Initializer::Constant(0.5).initialize(&[2, 2], &mut rng).sum(),
            2.0
        );
    }

    #[test]
    fn test_seeded_initialization_is_reproducible() {
        let a = Initializer::HeUniform.initialize(&[4, 4], &mut StdRng::seed_from_u64(9));
        let b = Initializer::HeUniform.initialize(&[4, 4], &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
