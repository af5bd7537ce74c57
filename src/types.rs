//! The static type of a symbolic tensor: element type, shape and representation.
use crate::dtype::DType;
use crate::shape::Shape;
use core::fmt;

/// How a tensor's data is stored. Fixed when a node is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Repr {
    /// Every position is explicit.
    Dense,
    /// Only nonzero positions are explicit (CSR matrices).
    Sparse,
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repr::Dense => f.write_str("dense"),
            Repr::Sparse => f.write_str("sparse"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TensorType {
    pub dtype: DType,
    pub shape: Shape,
    pub repr: Repr,
}

impl TensorType {
    pub fn new(dtype: DType, shape: impl Into<Shape>, repr: Repr) -> Self {
        TensorType {
            dtype,
            shape: shape.into(),
            repr,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.repr, self.dtype, self.shape)
    }
}
