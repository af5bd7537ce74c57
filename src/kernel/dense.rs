//! Kernels over [`DenseTensor`]s.
use super::scalar::{BinaryFn, UnaryFn};
use super::{dense_arg, kernel, Kernel, KernelCtx};
use crate::dtype::DType;
use crate::error::KernelError;
use crate::op::{Attrs, IndexSpec};
use crate::shape::{
    broadcast_concrete, check_permutation, normalize_axis, permute as permute_dims, repeat_concrete,
    reshape_concrete,
    Dim, Shape, ShapeError,
};
use crate::value::dense::strides;
use crate::value::{DenseTensor, Value};

use std::cmp::Ordering;

fn output(ctx: &KernelCtx<'_>, shape: Vec<usize>, data: Vec<f64>) -> Value {
    let dtype = ctx.output.dtype;
    let data = data.into_iter().map(|v| dtype.coerce(v)).collect();
    Value::Dense(DenseTensor::from_raw(dtype, shape, data))
}

// Type binary routines compute in: the promotion of both operand types.
pub(crate) fn compute_type(ctx: &KernelCtx<'_>) -> DType {
    ctx.operands
        .iter()
        .map(|t| t.dtype)
        .reduce(DType::promote)
        .unwrap_or(ctx.output.dtype)
}

////////////////////////////////////////////////////////////////////////////////
// Elementwise

pub fn unary(f: UnaryFn) -> Kernel {
    kernel(move |args, ctx| {
        let x = dense_arg(args, 0)?;
        let data = x.data().iter().map(|&v| f(v)).collect();
        Ok(output(ctx, x.shape().to_vec(), data))
    })
}

/// Strides of `src` viewed as a tensor of shape `target`, with 0 along broadcast dimensions.
pub(crate) fn broadcast_strides(src: &[usize], target: &[usize]) -> Vec<usize> {
    let offset = target.len() - src.len();
    let s = strides(src);
    (0..target.len())
        .map(|i| {
            if i < offset || src[i - offset] == 1 {
                0
            } else {
                s[i - offset]
            }
        })
        .collect()
}

// Advance a row-major multi-index; the caller bounds the number of steps.
fn increment(index: &mut [usize], shape: &[usize]) {
    for i in (0..index.len()).rev() {
        index[i] += 1;
        if index[i] < shape[i] {
            return;
        }
        index[i] = 0;
    }
}

pub(crate) fn zip_broadcast(
    a: &DenseTensor,
    b: &DenseTensor,
    f: impl Fn(f64, f64) -> Result<f64, KernelError>,
) -> Result<(Vec<usize>, Vec<f64>), KernelError> {
    let shape = broadcast_concrete(a.shape(), b.shape())?;
    let sa = broadcast_strides(a.shape(), &shape);
    let sb = broadcast_strides(b.shape(), &shape);
    let n: usize = shape.iter().product();

    let mut index = vec![0; shape.len()];
    let mut data = Vec::with_capacity(n);
    for _ in 0..n {
        let oa: usize = index.iter().zip(&sa).map(|(i, s)| i * s).sum();
        let ob: usize = index.iter().zip(&sb).map(|(i, s)| i * s).sum();
        data.push(f(a.data()[oa], b.data()[ob])?);
        increment(&mut index, &shape);
    }
    Ok((shape, data))
}

pub fn binary(f: BinaryFn) -> Kernel {
    kernel(move |args, ctx| {
        let a = dense_arg(args, 0)?;
        let b = dense_arg(args, 1)?;
        let t = compute_type(ctx);
        let (shape, data) = zip_broadcast(a, b, |x, y| f(x, y, t))?;
        Ok(output(ctx, shape, data))
    })
}

////////////////////////////////////////////////////////////////////////////////
// Reductions and scans

/// Split `shape` around `axis` into `(outer, len, inner)` extents.
fn lanes(shape: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = shape[..axis].iter().product();
    let inner = shape[axis + 1..].iter().product();
    (outer, shape[axis], inner)
}

fn axis_of(ctx: &KernelCtx<'_>, ndim: usize) -> Result<Option<usize>, KernelError> {
    match ctx.attrs {
        Attrs::Axis(Some(a)) => Ok(Some(normalize_axis(*a, ndim)?)),
        _ => Ok(None),
    }
}

/// Apply `f` to every lane along `axis` (or to all elements), returning the reduced shape.
fn reduce_lanes(
    x: &DenseTensor,
    axis: Option<usize>,
    f: impl Fn(&[f64]) -> Result<f64, KernelError>,
) -> Result<(Vec<usize>, Vec<f64>), KernelError> {
    let Some(axis) = axis else {
        return Ok((vec![], vec![f(x.data())?]));
    };
    let (outer, len, inner) = lanes(x.shape(), axis);
    let mut data = Vec::with_capacity(outer * inner);
    let mut lane = Vec::with_capacity(len);
    for o in 0..outer {
        for i in 0..inner {
            lane.clear();
            lane.extend((0..len).map(|k| x.data()[(o * len + k) * inner + i]));
            data.push(f(&lane)?);
        }
    }
    let mut shape = x.shape().to_vec();
    shape.remove(axis);
    Ok((shape, data))
}

/// Replace every lane along `axis` by `f(lane)`, which has the same length.
fn scan_lanes(
    x: &DenseTensor,
    axis: Option<usize>,
    f: impl Fn(&[f64]) -> Vec<f64>,
) -> (Vec<usize>, Vec<f64>) {
    let Some(axis) = axis else {
        return (vec![x.len()], f(x.data()));
    };
    let (outer, len, inner) = lanes(x.shape(), axis);
    let mut data = vec![0.0; x.len()];
    let mut lane = Vec::with_capacity(len);
    for o in 0..outer {
        for i in 0..inner {
            lane.clear();
            lane.extend((0..len).map(|k| x.data()[(o * len + k) * inner + i]));
            for (k, v) in f(&lane).into_iter().enumerate() {
                data[(o * len + k) * inner + i] = v;
            }
        }
    }
    (x.shape().to_vec(), data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Prod,
    Mean,
    Var,
    Std,
    Min,
    Max,
    ArgMin,
    ArgMax,
    Ptp,
    Any,
    All,
}

fn variance(lane: &[f64]) -> f64 {
    let n = lane.len() as f64;
    let mean = lane.iter().sum::<f64>() / n;
    lane.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

// Position of the extreme element; NaN wins, ties keep the first.
fn arg_extreme(lane: &[f64], better: fn(f64, f64) -> bool) -> Result<usize, KernelError> {
    if lane.is_empty() {
        return Err(KernelError::EmptyReduction);
    }
    let mut best = 0;
    for (i, &v) in lane.iter().enumerate().skip(1) {
        if lane[best].is_nan() {
            break;
        }
        if v.is_nan() || better(v, lane[best]) {
            best = i;
        }
    }
    Ok(best)
}

fn extreme(lane: &[f64], better: fn(f64, f64) -> bool) -> Result<f64, KernelError> {
    arg_extreme(lane, better).map(|i| lane[i])
}

fn less(a: f64, b: f64) -> bool {
    a < b
}

fn greater(a: f64, b: f64) -> bool {
    a > b
}

impl Reduction {
    pub fn apply(self, lane: &[f64]) -> Result<f64, KernelError> {
        use Reduction::*;
        Ok(match self {
            Sum => lane.iter().sum(),
            Prod => lane.iter().product(),
            Mean => lane.iter().sum::<f64>() / lane.len() as f64,
            Var => variance(lane),
            Std => variance(lane).sqrt(),
            Min => extreme(lane, less)?,
            Max => extreme(lane, greater)?,
            ArgMin => arg_extreme(lane, less)? as f64,
            ArgMax => arg_extreme(lane, greater)? as f64,
            Ptp => extreme(lane, greater)? - extreme(lane, less)?,
            Any => lane.iter().any(|&v| v != 0.0) as u8 as f64,
            All => lane.iter().all(|&v| v != 0.0) as u8 as f64,
        })
    }
}

pub fn reduce(r: Reduction) -> Kernel {
    kernel(move |args, ctx| {
        let x = dense_arg(args, 0)?;
        let (shape, data) = reduce_lanes(x, axis_of(ctx, x.ndim())?, |lane| r.apply(lane))?;
        Ok(output(ctx, shape, data))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    CumSum,
    CumProd,
    ArgSort,
}

fn argsort(lane: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..lane.len()).collect();
    // stable, NaNs last
    order.sort_by(|&i, &j| match (lane[i].is_nan(), lane[j].is_nan()) {
        (false, false) => lane[i].partial_cmp(&lane[j]).unwrap_or(Ordering::Equal),
        (a, b) => a.cmp(&b),
    });
    order.into_iter().map(|i| i as f64).collect()
}

pub fn scan(s: Scan) -> Kernel {
    kernel(move |args, ctx| {
        let x = dense_arg(args, 0)?;
        let dtype = ctx.output.dtype;
        let (shape, data) = scan_lanes(x, axis_of(ctx, x.ndim())?, |lane| match s {
            Scan::CumSum => lane
                .iter()
                .scan(0.0, |acc, &v| {
                    *acc = dtype.coerce(*acc + v);
                    Some(*acc)
                })
                .collect(),
            Scan::CumProd => lane
                .iter()
                .scan(1.0, |acc, &v| {
                    *acc = dtype.coerce(*acc * v);
                    Some(*acc)
                })
                .collect(),
            Scan::ArgSort => argsort(lane),
        });
        Ok(output(ctx, shape, data))
    })
}

fn matrix_dims(x: &DenseTensor) -> Result<(usize, usize), KernelError> {
    match x.shape() {
        &[r, c] => Ok((r, c)),
        _ => Err(ShapeError::Rank {
            expected: "a 2-D tensor",
            got: x.ndim(),
        }
        .into()),
    }
}

pub fn trace() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let (r, c) = matrix_dims(x)?;
        let sum = (0..r.min(c)).map(|i| x.data()[i * c + i]).sum();
        Ok(output(ctx, vec![], vec![sum]))
    })
}

/// Coordinates of the nonzero elements as an `(ndim, nnz)` array.
pub fn nonzero() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let ndim = x.ndim();
        let mut coords: Vec<Vec<f64>> = vec![vec![]; ndim];
        let mut index = vec![0; ndim];
        for &v in x.data() {
            if v != 0.0 {
                for (axis, &i) in index.iter().enumerate() {
                    coords[axis].push(i as f64);
                }
            }
            increment(&mut index, x.shape());
        }
        let nnz = x.data().iter().filter(|&&v| v != 0.0).count();
        Ok(output(ctx, vec![ndim, nnz], coords.concat()))
    })
}

pub fn nonzero_values() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let values: Vec<f64> = x.data().iter().copied().filter(|&v| v != 0.0).collect();
        Ok(output(ctx, vec![values.len()], values))
    })
}

////////////////////////////////////////////////////////////////////////////////
// Shape transforms

pub fn flatten() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        Ok(output(ctx, vec![x.len()], x.data().to_vec()))
    })
}

pub fn reshape() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let Attrs::Shape(target) = ctx.attrs else {
            return Ok(Value::Dense(x.clone()));
        };
        let shape = reshape_concrete(x.shape(), target)?;
        Ok(output(ctx, shape, x.data().to_vec()))
    })
}

pub(crate) fn permute_tensor(x: &DenseTensor, perm: &[usize]) -> Result<(Vec<usize>, Vec<f64>), KernelError> {
    check_permutation(perm, x.ndim())?;
    let shape = permute_dims(x.shape(), perm);
    let src = permute_dims(&x.strides(), perm);
    let mut index = vec![0; shape.len()];
    let data = (0..x.len())
        .map(|_| {
            let offset: usize = index.iter().zip(&src).map(|(i, s)| i * s).sum();
            increment(&mut index, &shape);
            x.data()[offset]
        })
        .collect();
    Ok((shape, data))
}

pub fn permute() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let perm = match ctx.attrs {
            Attrs::Permutation(p) => p.clone(),
            _ => (0..x.ndim()).rev().collect(),
        };
        let (shape, data) = permute_tensor(x, &perm)?;
        Ok(output(ctx, shape, data))
    })
}

/// Axes removed by `squeeze`: the requested one, or every axis declared with size 1.
pub(crate) fn squeezed_axes(ctx: &KernelCtx<'_>, shape: &[usize]) -> Result<Vec<usize>, KernelError> {
    match ctx.attrs {
        Attrs::Axis(Some(a)) => {
            let a = normalize_axis(*a, shape.len())?;
            if shape[a] != 1 {
                return Err(ShapeError::Squeeze {
                    axis: a,
                    size: Dim::Fixed(shape[a]),
                }
                .into());
            }
            Ok(vec![a])
        }
        _ => Ok(ctx.operands[0]
            .shape
            .dims()
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == Dim::Fixed(1))
            .map(|(i, _)| i)
            .collect()),
    }
}

pub fn squeeze() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let axes = squeezed_axes(ctx, x.shape())?;
        let shape = x
            .shape()
            .iter()
            .enumerate()
            .filter(|(i, _)| !axes.contains(i))
            .map(|(_, &n)| n)
            .collect();
        Ok(output(ctx, shape, x.data().to_vec()))
    })
}

pub fn diagonal() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let (r, c) = matrix_dims(x)?;
        let data: Vec<f64> = (0..r.min(c)).map(|i| x.data()[i * c + i]).collect();
        Ok(output(ctx, vec![data.len()], data))
    })
}

pub fn repeat() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let Attrs::Repeat { repeats, axis } = ctx.attrs else {
            return Ok(Value::Dense(x.clone()));
        };
        let repeats = *repeats;
        let shape = repeat_concrete(x.shape(), repeats, *axis)?;
        let Some(axis) = axis else {
            let data = x
                .data()
                .iter()
                .flat_map(|&v| std::iter::repeat(v).take(repeats))
                .collect();
            return Ok(output(ctx, shape, data));
        };
        let axis = normalize_axis(*axis, x.ndim())?;
        let (outer, len, inner) = lanes(x.shape(), axis);
        let mut data = Vec::with_capacity(shape.iter().product());
        for o in 0..outer {
            for k in 0..len {
                let start = (o * len + k) * inner;
                for _ in 0..repeats {
                    data.extend_from_slice(&x.data()[start..start + inner]);
                }
            }
        }
        Ok(output(ctx, shape, data))
    })
}

/// Source positions selected along each axis, and whether the axis is kept in the result.
pub(crate) fn selection(specs: &[IndexSpec], shape: &[usize]) -> Result<Vec<(Vec<usize>, bool)>, KernelError> {
    if specs.len() > shape.len() {
        return Err(ShapeError::TooManyIndices {
            given: specs.len(),
            ndim: shape.len(),
        }
        .into());
    }
    shape
        .iter()
        .enumerate()
        .map(|(axis, &n)| -> Result<(Vec<usize>, bool), KernelError> {
            match specs.get(axis).copied().unwrap_or(IndexSpec::full()) {
                IndexSpec::At(i) => Ok((vec![IndexSpec::resolve_at(i, axis, n)?], false)),
                IndexSpec::Slice { start, stop, step } => {
                    let s = IndexSpec::resolve_slice(start, stop, step, n)?;
                    Ok(((0..s.len).map(|i| s.source(i)).collect(), true))
                }
            }
        })
        .collect()
}

pub fn index() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        let specs: &[IndexSpec] = match ctx.attrs {
            Attrs::Index(specs) => specs,
            _ => &[],
        };
        let sel = selection(specs, x.shape())?;
        let extents: Vec<usize> = sel.iter().map(|(p, _)| p.len()).collect();
        let n: usize = extents.iter().product();
        let strides = x.strides();

        let mut index = vec![0; extents.len()];
        let mut data = Vec::with_capacity(n);
        for _ in 0..n {
            let offset: usize = index
                .iter()
                .zip(&sel)
                .zip(&strides)
                .map(|((&i, (positions, _)), s)| positions[i] * s)
                .sum();
            data.push(x.data()[offset]);
            increment(&mut index, &extents);
        }
        let shape = sel
            .iter()
            .filter(|(_, kept)| *kept)
            .map(|(p, _)| p.len())
            .collect();
        Ok(output(ctx, shape, data))
    })
}

////////////////////////////////////////////////////////////////////////////////
// Matrix product

/// View a 1-D or 2-D tensor as a matrix; vectors become a row (`lhs`) or a column.
pub(crate) fn as_matrix(x: &[usize], lhs: bool) -> Result<(usize, usize), KernelError> {
    match *x {
        [n] if lhs => Ok((1, n)),
        [n] => Ok((n, 1)),
        [r, c] => Ok((r, c)),
        _ => Err(ShapeError::Rank {
            expected: "a 1-D or 2-D tensor",
            got: x.len(),
        }
        .into()),
    }
}

/// Result shape of `a · b` once vector axes are dropped again.
pub(crate) fn dot_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>, KernelError> {
    let (m, k) = as_matrix(a, true)?;
    let (k2, n) = as_matrix(b, false)?;
    if k != k2 {
        return Err(ShapeError::Mismatch {
            what: "inner dimensions of dot",
            lhs: Shape::fixed(a),
            rhs: Shape::fixed(b),
        }
        .into());
    }
    let mut shape = vec![];
    if a.len() == 2 {
        shape.push(m);
    }
    if b.len() == 2 {
        shape.push(n);
    }
    Ok(shape)
}

pub fn dot() -> Kernel {
    kernel(|args, ctx| {
        let a = dense_arg(args, 0)?;
        let b = dense_arg(args, 1)?;
        let shape = dot_shape(a.shape(), b.shape())?;
        let (m, k) = as_matrix(a.shape(), true)?;
        let (_, n) = as_matrix(b.shape(), false)?;
        let mut data = vec![0.0; m * n];
        for i in 0..m {
            for p in 0..k {
                let av = a.data()[i * k + p];
                for j in 0..n {
                    data[i * n + j] += av * b.data()[p * n + j];
                }
            }
        }
        Ok(output(ctx, shape, data))
    })
}

////////////////////////////////////////////////////////////////////////////////
// Representation conversion

pub fn to_sparse() -> Kernel {
    kernel(|args, ctx| {
        let x = dense_arg(args, 0)?;
        Ok(Value::Sparse(crate::value::CsrMatrix::from_dense(&x.cast(ctx.output.dtype))?))
    })
}
