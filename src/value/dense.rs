use super::ValueError;
use crate::dtype::DType;
use crate::shape::ShapeError;

use num_traits::{NumCast, ToPrimitive};

/// A dense, row-major tensor.
///
/// Elements are stored as `f64` and kept inside the value set of `dtype` by
/// [`DType::coerce`]: integers are whole numbers within range, bools are `0` or `1`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl DenseTensor {
    /// Create a tensor, coercing every element into `dtype`.
    ///
    /// 64-bit integer elements must lie below `2^53` in magnitude.
    pub fn new(dtype: DType, shape: Vec<usize>, data: Vec<f64>) -> Result<Self, ValueError> {
        let numel = crate::shape::checked_product(&shape);
        if numel != Some(data.len()) {
            return Err(ShapeError::Reshape {
                from: crate::shape::Shape::fixed(&[data.len()]),
                to: shape.iter().map(|&d| d as isize).collect(),
            }
            .into());
        }
        if let Some(&value) = data.iter().find(|&&v| !dtype.holds_exactly(v)) {
            return Err(ValueError::Inexact { dtype, value });
        }
        let data = data.into_iter().map(|v| dtype.coerce(v)).collect();
        Ok(DenseTensor { dtype, shape, data })
    }

    /// Create a tensor from any primitive numeric elements.
    pub fn from_vec<T: ToPrimitive>(
        dtype: DType,
        shape: Vec<usize>,
        data: Vec<T>,
    ) -> Result<Self, ValueError> {
        let data = data
            .into_iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect();
        Self::new(dtype, shape, data)
    }

    /// Create a 2-D tensor from rows of equal length.
    ///
    /// ```rust
    /// use symgraph::{DType, DenseTensor};
    /// let x = DenseTensor::matrix(DType::Int64, &[[1, 0, 2], [-1, 0, 0]]);
    /// assert_eq!(x.shape(), &[2, 3]);
    /// ```
    pub fn matrix<T: ToPrimitive + Copy, const N: usize>(dtype: DType, rows: &[[T; N]]) -> Self {
        let data = rows
            .iter()
            .flat_map(|row| row.iter().map(|v| v.to_f64().unwrap_or(f64::NAN)))
            .map(|v| dtype.coerce(v))
            .collect();
        DenseTensor {
            dtype,
            shape: vec![rows.len(), N],
            data,
        }
    }

    /// A 0-D tensor holding `v`.
    pub fn scalar(dtype: DType, v: f64) -> Self {
        DenseTensor {
            dtype,
            shape: vec![],
            data: vec![dtype.coerce(v)],
        }
    }

    pub fn zeros(dtype: DType, shape: Vec<usize>) -> Self {
        Self::full(dtype, shape, 0.0)
    }

    pub fn full(dtype: DType, shape: Vec<usize>, v: f64) -> Self {
        let n = shape.iter().product();
        DenseTensor {
            dtype,
            shape,
            data: vec![dtype.coerce(v); n],
        }
    }

    // Build without coercion; for kernels whose outputs are already in range.
    pub(crate) fn from_raw(dtype: DType, shape: Vec<usize>, data: Vec<f64>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        DenseTensor { dtype, shape, data }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Row-major strides, in elements.
    pub fn strides(&self) -> Vec<usize> {
        strides(&self.shape)
    }

    /// Read element at a multi-index.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.ndim() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }
        let offset: usize = index.iter().zip(self.strides()).map(|(i, s)| i * s).sum();
        self.data.get(offset).copied()
    }

    /// Re-type the tensor, coercing each element.
    pub fn cast(&self, dtype: DType) -> Self {
        DenseTensor {
            dtype,
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| dtype.coerce(v)).collect(),
        }
    }

    /// Same data, different shape with the same element count.
    pub fn reshaped(self, shape: Vec<usize>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), self.data.len());
        DenseTensor { shape, ..self }
    }

    /// Convert the elements to a primitive type, if every element is representable.
    pub fn to_vec<T: NumCast>(&self) -> Option<Vec<T>> {
        self.data.iter().map(|&v| T::from(v)).collect()
    }

    /// Rows of a 2-D tensor.
    pub fn to_rows(&self) -> Option<Vec<Vec<f64>>> {
        match self.shape.as_slice() {
            [_, cols] if *cols > 0 => Some(self.data.chunks(*cols).map(<[f64]>::to_vec).collect()),
            [rows, 0] => Some(vec![vec![]; *rows]),
            _ => None,
        }
    }

    pub fn first_inexact(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .find(|&v| !self.dtype.holds_exactly(v))
    }

    /// Elementwise comparison with tolerance; NaNs compare equal to NaNs.
    pub fn allclose(&self, other: &DenseTensor, rtol: f64, atol: f64) -> bool {
        self.shape == other.shape
            && self.data.iter().zip(&other.data).all(|(&a, &b)| {
                (a.is_nan() && b.is_nan())
                    || a == b
                    || (a - b).abs() <= atol + rtol * b.abs()
            })
    }
}

pub(crate) fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}
