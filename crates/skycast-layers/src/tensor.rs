//! Tensor type for neural network computations.
//!
//! [`Tensor`] wraps an `ndarray::ArrayD<f32>` kept in standard (row-major)
//! layout, so the flat [`Tensor::data`] view is always available. The layers in
//! this crate only need rank 1 and rank 2 tensors; matrix operations assert on
//! rank and panic on misuse, the same way `ndarray` does.

use ndarray::{ArrayD, Axis, Ix2, IxDyn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A multi-dimensional array of `f32` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// Creates a new tensor with the given shape, filled with zeros.
    ///
    /// # Example
    ///
    /// ```
    /// use skycast_layers::tensor::Tensor;
    ///
    /// let t = Tensor::zeros(&[2, 3]);
    /// assert_eq!(t.shape(), &[2, 3]);
    /// assert_eq!(t.numel(), 6);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// Creates a new tensor with the given shape, filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::ones(IxDyn(shape)),
        }
    }

    /// Creates a tensor with every element set to `value`.
    pub fn full(shape: &[usize], value: f32) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    /// Creates a new tensor with the given shape and row-major data.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match the shape.
    pub fn from_data(shape: &[usize], data: Vec<f32>) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            numel,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            numel
        );
        let data = ArrayD::from_shape_vec(IxDyn(shape), data)
            .unwrap_or_else(|e| panic!("invalid tensor shape {:?}: {}", shape, e));
        Self { data }
    }

    /// Wraps an existing ndarray, copying it into standard layout if needed.
    pub fn from_ndarray(data: ArrayD<f32>) -> Self {
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Self { data }
    }

    /// Creates a tensor with values drawn uniformly from `[low, high)`.
    pub fn random_uniform<R: Rng + ?Sized>(
        shape: &[usize],
        low: f32,
        high: f32,
        rng: &mut R,
    ) -> Self {
        let numel: usize = shape.iter().product();
        let data = (0..numel).map(|_| rng.gen_range(low..high)).collect();
        Self::from_data(shape, data)
    }

    /// Returns the underlying ndarray.
    pub fn as_ndarray(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Returns the elements in row-major order.
    pub fn data(&self) -> &[f32] {
        self.data
            .as_slice()
            .expect("tensor storage is kept in standard layout")
    }

    /// Returns the elements in row-major order, mutably.
    pub fn data_mut(&mut self) -> &mut [f32] {
        self.data
            .as_slice_mut()
            .expect("tensor storage is kept in standard layout")
    }

    /// Returns row `index` of a 2D tensor as a `[1, n]` tensor.
    pub fn row(&self, index: usize) -> Tensor {
        assert_eq!(self.ndim(), 2, "row requires a 2D tensor");
        let row = self.data.index_axis(Axis(0), index).insert_axis(Axis(0));
        Tensor::from_ndarray(row.to_owned())
    }

    /// Gathers the given rows of a 2D tensor, in order.
    pub fn select_rows(&self, indices: &[usize]) -> Tensor {
        assert_eq!(self.ndim(), 2, "select_rows requires a 2D tensor");
        Tensor::from_ndarray(self.data.select(Axis(0), indices))
    }

    /// Matrix multiplication between two 2D tensors.
    ///
    /// # Panics
    ///
    /// Panics if either tensor is not 2D or the inner dimensions don't match.
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(other.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(
            self.shape()[1],
            other.shape()[0],
            "Inner dimensions must match for matmul"
        );
        let lhs = self.as_matrix();
        let rhs = other.as_matrix();
        Tensor::from_ndarray(lhs.dot(&rhs).into_dyn())
    }

    /// Transposes a 2D tensor.
    pub fn transpose(&self) -> Tensor {
        assert_eq!(self.ndim(), 2, "transpose requires 2D tensor");
        Tensor::from_ndarray(self.data.clone().reversed_axes())
    }

    /// Element-wise addition with broadcasting (e.g. `[n, d] + [d]`).
    pub fn add(&self, other: &Tensor) -> Tensor {
        Tensor::from_ndarray(&self.data + &other.data)
    }

    /// Element-wise subtraction with broadcasting.
    pub fn sub(&self, other: &Tensor) -> Tensor {
        Tensor::from_ndarray(&self.data - &other.data)
    }

    /// Element-wise multiplication with broadcasting.
    pub fn mul(&self, other: &Tensor) -> Tensor {
        Tensor::from_ndarray(&self.data * &other.data)
    }

    /// Element-wise division with broadcasting.
    pub fn div(&self, other: &Tensor) -> Tensor {
        Tensor::from_ndarray(&self.data / &other.data)
    }

    /// Scalar multiplication.
    pub fn scale(&self, scalar: f32) -> Tensor {
        Tensor::from_ndarray(&self.data * scalar)
    }

    /// Element-wise square.
    pub fn sqr(&self) -> Tensor {
        self.map(|x| x * x)
    }

    /// Element-wise square root.
    pub fn sqrt(&self) -> Tensor {
        self.map(f32::sqrt)
    }

    /// Element-wise absolute value.
    pub fn abs(&self) -> Tensor {
        self.map(f32::abs)
    }

    /// Element-wise sign: `1` for positive, `-1` for negative, `0` for zero.
    pub fn sign(&self) -> Tensor {
        self.map(|x| {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        })
    }

    /// Sum all elements in the tensor.
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// Mean of all elements; `0.0` for an empty tensor.
    pub fn mean(&self) -> f32 {
        if self.numel() == 0 {
            return 0.0;
        }
        self.sum() / self.numel() as f32
    }

    /// Sum along an axis, removing it.
    pub fn sum_axis(&self, axis: usize) -> Tensor {
        assert!(axis < self.ndim(), "Axis out of bounds");
        Tensor::from_ndarray(self.data.sum_axis(Axis(axis)))
    }

    /// Mean along an axis, removing it.
    pub fn mean_axis(&self, axis: usize) -> Tensor {
        let count = self.shape()[axis] as f32;
        self.sum_axis(axis).scale(1.0 / count)
    }

    /// Population variance along an axis, removing it.
    pub fn var_axis(&self, axis: usize) -> Tensor {
        assert!(axis < self.ndim(), "Axis out of bounds");
        Tensor::from_ndarray(self.data.var_axis(Axis(axis), 0.0))
    }

    /// Apply a function element-wise.
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32,
    {
        Tensor::from_ndarray(self.data.mapv(f))
    }

    /// Returns true when every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Reshape the tensor to a new shape.
    ///
    /// # Panics
    ///
    /// Panics if the new shape has a different number of elements.
    pub fn reshape(&self, new_shape: &[usize]) -> Tensor {
        let new_numel: usize = new_shape.iter().product();
        assert_eq!(
            self.numel(),
            new_numel,
            "Cannot reshape tensor of {} elements to shape {:?}",
            self.numel(),
            new_shape
        );
        Tensor::from_data(new_shape, self.data().to_vec())
    }

    fn as_matrix(&self) -> ndarray::ArrayView2<'_, f32> {
        self.data
            .view()
            .into_dimensionality::<Ix2>()
            .expect("rank checked by caller")
    }
}

impl std::ops::Add for &Tensor {
    type Output = Tensor;

    fn add(self, other: &Tensor) -> Tensor {
        Tensor::add(self, other)
    }
}

impl std::ops::Sub for &Tensor {
    type Output = Tensor;

    fn sub(self, other: &Tensor) -> Tensor {
        Tensor::sub(self, other)
    }
}

impl std::ops::Mul for &Tensor {
    type Output = Tensor;

    fn mul(self, other: &Tensor) -> Tensor {
        Tensor::mul(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tensor_creation() {
        let t = Tensor::zeros(&[2, 3]);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.numel(), 6);
        assert!(t.data().iter().all(|&x| x == 0.0));

        let t = Tensor::ones(&[3, 2]);
        assert!(t.data().iter().all(|&x| x == 1.0));
    }

    #[test]
    #[should_panic]
    fn test_from_data_wrong_length() {
        Tensor::from_data(&[2, 2], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_matmul() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = Tensor::from_data(&[3, 2], vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let c = a.matmul(&b);
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(c.data(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_transpose_is_contiguous() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = a.transpose();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_add_broadcasts_bias() {
        let a = Tensor::zeros(&[2, 3]);
        let b = Tensor::from_data(&[3], vec![1.0, 2.0, 3.0]);
        let c = a.add(&b);
        assert_eq!(c.data(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_axis_statistics() {
        let a = Tensor::from_data(&[2, 2], vec![1.0, 2.0, 3.0, 6.0]);
        assert_eq!(a.sum_axis(0).data(), &[4.0, 8.0]);
        assert_eq!(a.mean_axis(0).data(), &[2.0, 4.0]);
        assert_eq!(a.var_axis(0).data(), &[1.0, 4.0]);
        assert_eq!(a.sum(), 12.0);
    }

    #[test]
    fn test_select_rows() {
        let a = Tensor::from_data(&[3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let s = a.select_rows(&[2, 0]);
        assert_eq!(s.data(), &[5.0, 6.0, 1.0, 2.0]);
        assert_eq!(a.row(1).shape(), &[1, 2]);
    }

    #[test]
    fn test_random_uniform_bounds_and_seed() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = Tensor::random_uniform(&[10, 10], -0.5, 0.5, &mut rng);
        assert!(a.data().iter().all(|&x| (-0.5..0.5).contains(&x)));

        let mut rng = StdRng::seed_from_u64(7);
        let b = Tensor::random_uniform(&[10, 10], -0.5, 0.5, &mut rng);
        assert_eq!(a, b);
    }

    #[test]
    fn test_reshape() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let r = a.reshape(&[3, 2]);
        assert_eq!(r.shape(), &[3, 2]);
        assert_eq!(r.data(), a.data());
    }

    #[test]
    fn test_sign_and_finite() {
        let a = Tensor::from_data(&[3], vec![-2.0, 0.0, 3.0]);
        assert_eq!(a.sign().data(), &[-1.0, 0.0, 1.0]);
        assert!(a.is_finite());
        assert!(!Tensor::from_data(&[1], vec![f32::NAN]).is_finite());
    }
}
