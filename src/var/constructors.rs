use super::var::{SharedGraph, Var};
use crate::dtype::DType;
use crate::error::Result;
use crate::shape::Shape;
use crate::types::Repr;

/// A dense 0-D placeholder.
pub fn scalar(state: &SharedGraph, name: &str, dtype: DType) -> Result<Var> {
    Var::placeholder(state, name, dtype, Shape::scalar(), Repr::Dense)
}

/// A dense 1-D placeholder of unknown length.
pub fn vector(state: &SharedGraph, name: &str, dtype: DType) -> Result<Var> {
    Var::placeholder(state, name, dtype, Shape::unknown(1), Repr::Dense)
}

/// A dense 2-D placeholder of unknown size.
pub fn matrix(state: &SharedGraph, name: &str, dtype: DType) -> Result<Var> {
    Var::placeholder(state, name, dtype, Shape::unknown(2), Repr::Dense)
}

/// A sparse matrix placeholder of unknown size.
pub fn csr_matrix(state: &SharedGraph, name: &str, dtype: DType) -> Result<Var> {
    Var::placeholder(state, name, dtype, Shape::unknown(2), Repr::Sparse)
}

macro_rules! typed {
    ($($dtype:ident: $scalar:ident $vector:ident $matrix:ident $csr:ident;)*) => {
        $(
            pub fn $scalar(state: &SharedGraph, name: &str) -> Result<Var> {
                scalar(state, name, DType::$dtype)
            }

            pub fn $vector(state: &SharedGraph, name: &str) -> Result<Var> {
                vector(state, name, DType::$dtype)
            }

            pub fn $matrix(state: &SharedGraph, name: &str) -> Result<Var> {
                matrix(state, name, DType::$dtype)
            }

            pub fn $csr(state: &SharedGraph, name: &str) -> Result<Var> {
                csr_matrix(state, name, DType::$dtype)
            }
        )*
    };
}

// Prefixes: b int8, w int16, i int32, l int64, f float32, d float64.
typed! {
    Int8: bscalar bvector bmatrix csr_bmatrix;
    Int16: wscalar wvector wmatrix csr_wmatrix;
    Int32: iscalar ivector imatrix csr_imatrix;
    Int64: lscalar lvector lmatrix csr_lmatrix;
    Float32: fscalar fvector fmatrix csr_fmatrix;
    Float64: dscalar dvector dmatrix csr_dmatrix;
}
