use crate::dtype::DType;
use crate::shape::ShapeError;
use crate::value::dense::DenseTensor;

/// A compressed-sparse-row matrix.
///
/// # Invariants
///
/// - `indptr.len() == rows + 1`, `indptr[0] == 0`, `indptr` is nondecreasing
/// - within each row, `indices` are strictly increasing and `< cols`
/// - `data` holds no explicit zeros
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    dtype: DType,
    shape: [usize; 2],
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// The all-zero matrix.
    pub fn empty(dtype: DType, shape: [usize; 2]) -> Self {
        CsrMatrix {
            dtype,
            shape,
            indptr: vec![0; shape[0] + 1],
            indices: vec![],
            data: vec![],
        }
    }

    /// Compress a dense 2-D tensor.
    pub fn from_dense(t: &DenseTensor) -> Result<Self, ShapeError> {
        let [rows, cols] = match t.shape() {
            &[r, c] => [r, c],
            _ => {
                return Err(ShapeError::Rank {
                    expected: "a 2-D tensor",
                    got: t.ndim(),
                })
            }
        };
        let mut m = CsrMatrix::empty(t.dtype(), [rows, cols]);
        for r in 0..rows {
            for c in 0..cols {
                let v = t.data()[r * cols + c];
                if v != 0.0 {
                    m.indices.push(c);
                    m.data.push(v);
                }
            }
            m.indptr[r + 1] = m.indices.len();
        }
        Ok(m)
    }

    /// Build from `(row, col, value)` triplets in any order. Duplicates are summed and zeros dropped.
    pub fn from_triplets(
        dtype: DType,
        shape: [usize; 2],
        mut triplets: Vec<(usize, usize, f64)>,
    ) -> Result<Self, ShapeError> {
        if let Some(&(r, c, _)) = triplets.iter().find(|(r, c, _)| *r >= shape[0] || *c >= shape[1])
        {
            let (index, axis, size) = if r >= shape[0] {
                (r, 0, shape[0])
            } else {
                (c, 1, shape[1])
            };
            return Err(ShapeError::Index {
                index: index as isize,
                axis,
                size,
            });
        }
        triplets.sort_by_key(|&(r, c, _)| (r, c));

        let mut m = CsrMatrix::empty(dtype, shape);
        let mut i = 0;
        for r in 0..shape[0] {
            while i < triplets.len() && triplets[i].0 == r {
                let c = triplets[i].1;
                let mut v = 0.0;
                while i < triplets.len() && triplets[i].0 == r && triplets[i].1 == c {
                    v += triplets[i].2;
                    i += 1;
                }
                let v = dtype.coerce(v);
                if v != 0.0 {
                    m.indices.push(c);
                    m.data.push(v);
                }
            }
            m.indptr[r + 1] = m.indices.len();
        }
        Ok(m)
    }

    // Rows must already satisfy the struct invariants, modulo explicit zeros.
    pub(crate) fn from_rows_unchecked(
        dtype: DType,
        shape: [usize; 2],
        rows: impl IntoIterator<Item = Vec<(usize, f64)>>,
    ) -> Self {
        let mut m = CsrMatrix::empty(dtype, shape);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, v) in row {
                if v != 0.0 {
                    m.indices.push(c);
                    m.data.push(v);
                }
            }
            m.indptr[r + 1] = m.indices.len();
        }
        m
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    pub fn cols(&self) -> usize {
        self.shape[1]
    }

    /// Number of stored (nonzero) entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Column indices and values of row `r`.
    pub fn row(&self, r: usize) -> (&[usize], &[f64]) {
        let (lo, hi) = (self.indptr[r], self.indptr[r + 1]);
        (&self.indices[lo..hi], &self.data[lo..hi])
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        let (cols, vals) = self.row(r);
        cols.binary_search(&c).map_or(0.0, |i| vals[i])
    }

    /// Iterate stored entries as `(row, col, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.rows()).flat_map(move |r| {
            let (cols, vals) = self.row(r);
            cols.iter().zip(vals).map(move |(&c, &v)| (r, c, v))
        })
    }

    pub fn to_dense(&self) -> DenseTensor {
        let cols = self.cols();
        let mut data = vec![0.0; self.rows() * cols];
        for (r, c, v) in self.iter() {
            data[r * cols + c] = v;
        }
        DenseTensor::from_raw(self.dtype, vec![self.rows(), cols], data)
    }

    /// Apply `f` to the stored entries only; `f` must map zero to zero.
    pub fn map_stored(&self, dtype: DType, f: impl Fn(f64) -> f64) -> Self {
        let mut m = CsrMatrix::empty(dtype, self.shape);
        for r in 0..self.rows() {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals) {
                let y = dtype.coerce(f(v));
                if y != 0.0 {
                    m.indices.push(c);
                    m.data.push(y);
                }
            }
            m.indptr[r + 1] = m.indices.len();
        }
        m
    }

    pub fn transpose(&self) -> Self {
        let [rows, cols] = self.shape;
        let mut counts = vec![0usize; cols + 1];
        for &c in &self.indices {
            counts[c + 1] += 1;
        }
        for c in 0..cols {
            counts[c + 1] += counts[c];
        }
        let indptr = counts.clone();
        let mut next = counts;
        let mut indices = vec![0; self.nnz()];
        let mut data = vec![0.0; self.nnz()];
        for r in 0..rows {
            let (cs, vs) = self.row(r);
            for (&c, &v) in cs.iter().zip(vs) {
                let dst = next[c];
                indices[dst] = r;
                data[dst] = v;
                next[c] += 1;
            }
        }
        CsrMatrix {
            dtype: self.dtype,
            shape: [cols, rows],
            indptr,
            indices,
            data,
        }
    }

    pub fn cast(&self, dtype: DType) -> Self {
        self.map_stored(dtype, |v| v)
    }

    /// The first stored element `dtype` cannot hold exactly, if any.
    pub fn first_inexact(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .find(|&v| !self.dtype.holds_exactly(v))
    }
}
