//! Structural kernels over [`CsrMatrix`]es.
//!
//! Only operators which map zeros to zeros get a structural implementation here; the rest run
//! through [`super::via_dense`].
use super::dense::{self, as_matrix, compute_type, dot_shape, selection, squeezed_axes};
use super::scalar::{BinaryFn, UnaryFn};
use super::{dense_arg, kernel, sparse_arg, via_dense, Kernel, KernelCtx};
use crate::error::KernelError;
use crate::op::{Attrs, IndexSpec};
use crate::shape::{
    broadcast_concrete, normalize_axis, repeat_concrete, reshape_concrete, Shape, ShapeError,
};
use crate::types::Repr;
use crate::value::{CsrMatrix, DenseTensor, Value};

fn sparse_output(ctx: &KernelCtx<'_>, m: CsrMatrix) -> Value {
    if m.dtype() == ctx.output.dtype {
        Value::Sparse(m)
    } else {
        Value::Sparse(m.cast(ctx.output.dtype))
    }
}

fn dense_output(ctx: &KernelCtx<'_>, shape: Vec<usize>, data: Vec<f64>) -> Value {
    let dtype = ctx.output.dtype;
    let data = data.into_iter().map(|v| dtype.coerce(v)).collect();
    Value::Dense(DenseTensor::from_raw(dtype, shape, data))
}

// Use `structural` when the node is declared sparse, otherwise densify and run `fallback`.
fn structural_or(
    fallback: Kernel,
    structural: impl Fn(&CsrMatrix, &KernelCtx<'_>) -> Result<Value, KernelError> + Send + Sync + 'static,
) -> Kernel {
    let fallback = via_dense(fallback);
    kernel(move |args, ctx| match ctx.output.repr {
        Repr::Sparse => structural(sparse_arg(args, 0)?, ctx),
        Repr::Dense => fallback(args, ctx),
    })
}

// Use `structural` while every operand is finite. Otherwise implicit zeros stop absorbing
// (`0 * inf` is NaN), so densify and run `fallback`.
fn finite_or(fallback: Kernel, structural: Kernel) -> Kernel {
    let fallback = via_dense(fallback);
    kernel(move |args, ctx| {
        if args.iter().all(|v| v.is_finite()) {
            structural(args, ctx)
        } else {
            fallback(args, ctx)
        }
    })
}

/// Run `k` only if no sparse operand would be stretched by broadcasting.
///
/// Declared shapes are checked at build time; this catches extents left unknown until the call.
pub fn unstretched(k: Kernel) -> Kernel {
    kernel(move |args, ctx| {
        let shapes: Vec<Vec<usize>> = args.iter().map(|v| v.shape()).collect();
        let mut out = shapes.first().cloned().unwrap_or_default();
        for s in shapes.iter().skip(1) {
            out = broadcast_concrete(&out, s)?;
        }
        for (v, s) in args.iter().zip(&shapes) {
            if v.repr() == Repr::Sparse && *s != out {
                return Err(ShapeError::Mismatch {
                    what: "sparse operands cannot be broadcast",
                    lhs: Shape::fixed(s),
                    rhs: Shape::fixed(&out),
                }
                .into());
            }
        }
        k(args, ctx)
    })
}

////////////////////////////////////////////////////////////////////////////////
// Elementwise

/// `f` must satisfy `f(0) == 0`.
pub fn unary(f: UnaryFn) -> Kernel {
    kernel(move |args, ctx| {
        let x = sparse_arg(args, 0)?;
        Ok(Value::Sparse(x.map_stored(ctx.output.dtype, f)))
    })
}

/// Merge two matrices of equal shape over the union of their stored entries.
///
/// `f` must satisfy `f(0, 0) == 0`; results equal to zero are not stored.
pub fn merge(f: BinaryFn) -> Kernel {
    kernel(move |args, ctx| {
        let a = sparse_arg(args, 0)?;
        let b = sparse_arg(args, 1)?;
        if a.shape() != b.shape() {
            return Err(ShapeError::Mismatch {
                what: "sparse operands",
                lhs: Shape::fixed(&a.shape()),
                rhs: Shape::fixed(&b.shape()),
            }
            .into());
        }
        let t = compute_type(ctx);
        let out = ctx.output.dtype;

        let mut rows = Vec::with_capacity(a.rows());
        for r in 0..a.rows() {
            let (ca, va) = a.row(r);
            let (cb, vb) = b.row(r);
            let (mut i, mut j) = (0, 0);
            let mut row = Vec::with_capacity(ca.len() + cb.len());
            while i < ca.len() || j < cb.len() {
                let next_a = ca.get(i).copied().unwrap_or(usize::MAX);
                let next_b = cb.get(j).copied().unwrap_or(usize::MAX);
                let c = next_a.min(next_b);
                let x = if next_a == c {
                    i += 1;
                    va[i - 1]
                } else {
                    0.0
                };
                let y = if next_b == c {
                    j += 1;
                    vb[j - 1]
                } else {
                    0.0
                };
                row.push((c, out.coerce(f(x, y, t)?)));
            }
            rows.push(row);
        }
        Ok(Value::Sparse(CsrMatrix::from_rows_unchecked(out, a.shape(), rows)))
    })
}

/// Elementwise product of a sparse matrix with a dense tensor broadcast to its shape.
///
/// `sparse_first` gives the operand order.
pub fn mul_mixed(sparse_first: bool) -> Kernel {
    finite_or(dense::binary(super::scalar::mul), kernel(move |args, ctx| {
        let (sp, de) = if sparse_first { (0, 1) } else { (1, 0) };
        let m = sparse_arg(args, sp)?;
        let d = dense_arg(args, de)?;
        let shape = m.shape();
        if broadcast_concrete(d.shape(), &shape)? != shape {
            return Err(ShapeError::Broadcast(Shape::fixed(d.shape()), Shape::fixed(&shape)).into());
        }
        let strides = dense::broadcast_strides(d.shape(), &shape);
        let t = compute_type(ctx);
        let out = ctx.output.dtype;

        let triplets = m
            .iter()
            .map(|(r, c, v)| {
                let w = d.data()[r * strides[0] + c * strides[1]];
                let y = if sparse_first {
                    super::scalar::mul(v, w, t)?
                } else {
                    super::scalar::mul(w, v, t)?
                };
                Ok((r, c, out.coerce(y)))
            })
            .collect::<Result<Vec<_>, KernelError>>()?;
        Ok(Value::Sparse(CsrMatrix::from_triplets(out, shape, triplets)?))
    }))
}

////////////////////////////////////////////////////////////////////////////////
// Reductions

/// `sum` over all entries, rows or columns.
pub fn sum() -> Kernel {
    kernel(|args, ctx| {
        let x = sparse_arg(args, 0)?;
        let [rows, cols] = x.shape();
        match ctx.attrs {
            Attrs::Axis(Some(axis)) => {
                let (len, key): (usize, fn(usize, usize) -> usize) = match normalize_axis(*axis, 2)? {
                    0 => (cols, |_, c| c),
                    _ => (rows, |r, _| r),
                };
                let mut data = vec![0.0; len];
                for (r, c, v) in x.iter() {
                    data[key(r, c)] += v;
                }
                Ok(dense_output(ctx, vec![len], data))
            }
            _ => Ok(dense_output(ctx, vec![], vec![x.data().iter().sum()])),
        }
    })
}

////////////////////////////////////////////////////////////////////////////////
// Shape transforms

pub fn permute() -> Kernel {
    kernel(|args, ctx| {
        let x = sparse_arg(args, 0)?;
        match ctx.attrs {
            Attrs::Permutation(p) if p.as_slice() == [0, 1] => Ok(sparse_output(ctx, x.clone())),
            Attrs::Permutation(p) if p.as_slice() != [1, 0] => Err(ShapeError::Permutation {
                perm: p.clone(),
                ndim: 2,
            }
            .into()),
            _ => Ok(sparse_output(ctx, x.transpose())),
        }
    })
}

pub fn reshape() -> Kernel {
    structural_or(dense::reshape(), |x, ctx| {
        let Attrs::Shape(target) = ctx.attrs else {
            return Ok(Value::Sparse(x.clone()));
        };
        let shape = reshape_concrete(&x.shape(), target)?;
        let new_cols = shape[1];
        let cols = x.cols();
        let triplets = x
            .iter()
            .map(|(r, c, v)| {
                let linear = r * cols + c;
                (linear / new_cols, linear % new_cols, v)
            })
            .collect();
        Ok(sparse_output(
            ctx,
            CsrMatrix::from_triplets(x.dtype(), [shape[0], shape[1]], triplets)?,
        ))
    })
}

pub fn squeeze() -> Kernel {
    structural_or(dense::squeeze(), |x, ctx| {
        // a sparse result is still 2-D, so nothing may be removed
        let axes = squeezed_axes(ctx, &x.shape())?;
        if let Some(&axis) = axes.first() {
            return Err(ShapeError::Squeeze {
                axis,
                size: crate::shape::Dim::Fixed(x.shape()[axis]),
            }
            .into());
        }
        Ok(sparse_output(ctx, x.clone()))
    })
}

pub fn repeat() -> Kernel {
    structural_or(dense::repeat(), |x, ctx| {
        let Attrs::Repeat {
            repeats,
            axis: Some(axis),
        } = ctx.attrs
        else {
            return Ok(Value::Sparse(x.clone()));
        };
        let n = *repeats;
        let axis = normalize_axis(*axis, 2)?;
        let [rows, cols] = x.shape();
        let out = repeat_concrete(&[rows, cols], n, Some(axis as isize))?;
        let out = [out[0], out[1]];
        let m = if axis == 0 {
            let out_rows = (0..rows).flat_map(|r| {
                let (cs, vs) = x.row(r);
                let row: Vec<(usize, f64)> = cs.iter().copied().zip(vs.iter().copied()).collect();
                std::iter::repeat(row).take(n)
            });
            CsrMatrix::from_rows_unchecked(x.dtype(), out, out_rows)
        } else {
            let out_rows = (0..rows).map(|r| {
                let (cs, vs) = x.row(r);
                cs.iter()
                    .zip(vs)
                    .flat_map(|(&c, &v)| (0..n).map(move |k| (c * n + k, v)))
                    .collect::<Vec<_>>()
            });
            CsrMatrix::from_rows_unchecked(x.dtype(), out, out_rows)
        };
        Ok(sparse_output(ctx, m))
    })
}

/// Slicing a CSR matrix: rows are gathered, columns are remapped through the column selection.
pub fn index() -> Kernel {
    structural_or(dense::index(), |x, ctx| {
        let specs: &[IndexSpec] = match ctx.attrs {
            Attrs::Index(specs) => specs,
            _ => &[],
        };
        let sel = selection(specs, &x.shape())?;
        let (row_pos, col_pos) = (&sel[0].0, &sel[1].0);

        // Several output columns may read the same source column when the step is negative.
        let mut col_targets: Vec<Vec<usize>> = vec![vec![]; x.cols()];
        for (out_c, &src_c) in col_pos.iter().enumerate() {
            col_targets[src_c].push(out_c);
        }

        let rows = row_pos.iter().map(|&r| {
            let (cs, vs) = x.row(r);
            let mut row: Vec<(usize, f64)> = cs
                .iter()
                .zip(vs)
                .flat_map(|(&c, &v)| col_targets[c].iter().map(move |&oc| (oc, v)))
                .collect();
            row.sort_by_key(|&(c, _)| c);
            row
        });
        let m = CsrMatrix::from_rows_unchecked(x.dtype(), [row_pos.len(), col_pos.len()], rows);
        Ok(sparse_output(ctx, m))
    })
}

////////////////////////////////////////////////////////////////////////////////
// Matrix products

/// Sparse · sparse, accumulating each output row in a dense scratch row.
pub fn dot() -> Kernel {
    finite_or(dense::dot(), kernel(|args, ctx| {
        let a = sparse_arg(args, 0)?;
        let b = sparse_arg(args, 1)?;
        dot_shape(&a.shape(), &b.shape())?;
        let n = b.cols();

        let mut scratch = vec![0.0; n];
        let mut touched = vec![false; n];
        let mut rows = Vec::with_capacity(a.rows());
        for r in 0..a.rows() {
            let mut cols = vec![];
            let (ca, va) = a.row(r);
            for (&k, &av) in ca.iter().zip(va) {
                let (cb, vb) = b.row(k);
                for (&c, &bv) in cb.iter().zip(vb) {
                    if !touched[c] {
                        touched[c] = true;
                        cols.push(c);
                    }
                    scratch[c] += av * bv;
                }
            }
            cols.sort_unstable();
            let row = cols
                .iter()
                .map(|&c| {
                    let v = ctx.output.dtype.coerce(scratch[c]);
                    scratch[c] = 0.0;
                    touched[c] = false;
                    (c, v)
                })
                .collect::<Vec<_>>();
            rows.push(row);
        }
        Ok(Value::Sparse(CsrMatrix::from_rows_unchecked(
            ctx.output.dtype,
            [a.rows(), n],
            rows,
        )))
    }))
}

/// Sparse · dense, or dense · sparse when `sparse_first` is false. The result is dense.
pub fn dot_mixed(sparse_first: bool) -> Kernel {
    finite_or(dense::dot(), kernel(move |args, ctx| {
        let (m, d) = if sparse_first {
            (sparse_arg(args, 0)?, dense_arg(args, 1)?)
        } else {
            (sparse_arg(args, 1)?, dense_arg(args, 0)?)
        };
        let shape = if sparse_first {
            dot_shape(&m.shape(), d.shape())?
        } else {
            dot_shape(d.shape(), &m.shape())?
        };

        let data = if sparse_first {
            // (rows × k) · (k × n)
            let (_, n) = as_matrix(d.shape(), false)?;
            let mut data = vec![0.0; m.rows() * n];
            for (r, k, v) in m.iter() {
                for j in 0..n {
                    data[r * n + j] += v * d.data()[k * n + j];
                }
            }
            data
        } else {
            // (p × k) · (k × cols)
            let (p, k) = as_matrix(d.shape(), true)?;
            let n = m.cols();
            let mut data = vec![0.0; p * n];
            for i in 0..p {
                for (kk, c, v) in m.iter() {
                    data[i * n + c] += d.data()[i * k + kk] * v;
                }
            }
            data
        };
        Ok(dense_output(ctx, shape, data))
    }))
}

////////////////////////////////////////////////////////////////////////////////
// Representation conversion

pub fn to_dense() -> Kernel {
    kernel(|args, ctx| {
        let x = sparse_arg(args, 0)?;
        Ok(Value::Dense(x.to_dense().cast(ctx.output.dtype)))
    })
}

pub fn zeros_like() -> Kernel {
    kernel(|args, ctx| {
        let x = sparse_arg(args, 0)?;
        Ok(Value::Sparse(CsrMatrix::empty(ctx.output.dtype, x.shape())))
    })
}
