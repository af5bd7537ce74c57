//! Concrete values bound to placeholders and produced by kernels.
pub mod dense;
pub mod sparse;

pub use dense::DenseTensor;
pub use sparse::CsrMatrix;

use crate::dtype::DType;
use crate::shape::ShapeError;
use crate::types::Repr;

/// Failures building a concrete value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("{value} is outside the range of {dtype} values held exactly")]
    Inexact { dtype: DType, value: f64 },
}

/// A concrete tensor in one of the two representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Dense(DenseTensor),
    Sparse(CsrMatrix),
}

impl Value {
    pub fn repr(&self) -> Repr {
        match self {
            Value::Dense(_) => Repr::Dense,
            Value::Sparse(_) => Repr::Sparse,
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Value::Dense(t) => t.dtype(),
            Value::Sparse(m) => m.dtype(),
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Value::Dense(t) => t.shape().to_vec(),
            Value::Sparse(m) => m.shape().to_vec(),
        }
    }

    pub fn cast(&self, dtype: DType) -> Value {
        match self {
            Value::Dense(t) => Value::Dense(t.cast(dtype)),
            Value::Sparse(m) => Value::Sparse(m.cast(dtype)),
        }
    }

    /// The logical contents as a dense tensor, whatever the representation.
    pub fn to_dense(&self) -> DenseTensor {
        match self {
            Value::Dense(t) => t.clone(),
            Value::Sparse(m) => m.to_dense(),
        }
    }

    /// No element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Dense(t) => t.data().iter().all(|v| v.is_finite()),
            Value::Sparse(m) => m.data().iter().all(|v| v.is_finite()),
        }
    }

    /// The first element `dtype` cannot hold exactly, if any.
    pub fn first_inexact(&self) -> Option<f64> {
        match self {
            Value::Dense(t) => t.first_inexact(),
            Value::Sparse(m) => m.first_inexact(),
        }
    }

    pub fn as_dense(&self) -> Option<&DenseTensor> {
        match self {
            Value::Dense(t) => Some(t),
            Value::Sparse(_) => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&CsrMatrix> {
        match self {
            Value::Sparse(m) => Some(m),
            Value::Dense(_) => None,
        }
    }
}

impl From<DenseTensor> for Value {
    fn from(t: DenseTensor) -> Self {
        Value::Dense(t)
    }
}

impl From<CsrMatrix> for Value {
    fn from(m: CsrMatrix) -> Self {
        Value::Sparse(m)
    }
}
