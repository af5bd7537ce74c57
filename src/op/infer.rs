//! Build-time type and shape inference.
use super::attrs::{AttrKind, Attrs, IndexSpec};
use super::registry::OpDescriptor;
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::shape::{self, Dim, Shape, ShapeError};
use crate::types::TensorType;

/// How the result element type follows from the operand types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DTypeRule {
    /// Type of the first operand.
    Same,
    /// The float type of the first operand, see [`DType::float_upcast`].
    FloatUpcast,
    /// See [`DType::accumulator`].
    Accumulator,
    Int64,
    Bool,
    /// Promotion of all operand types.
    Promote,
    /// Promotion of all operand types, which must be bool or integer.
    Bitwise,
    /// Float promotion of all operand types.
    TrueDiv,
}

/// How the result shape follows from the operand shapes and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRule {
    Same,
    Broadcast,
    /// Drop the reduced axis, or all axes.
    Reduce,
    /// Same shape along an axis, flattened otherwise.
    Scan,
    /// Scalar from a matrix.
    Trace,
    /// `(ndim, ?)` coordinates.
    Nonzero,
    /// `(?,)` values.
    NonzeroValues,
    Flatten,
    Reshape,
    Permute,
    Squeeze,
    Diagonal,
    Repeat,
    Index,
    Dot,
    /// Same shape, which must be 2-D.
    Matrix,
}

fn require_matrix(op: &OpDescriptor, t: &TensorType) -> Result<()> {
    if t.ndim() == 2 {
        Ok(())
    } else {
        Err(op.shape_error(ShapeError::Rank {
            expected: "a 2-D tensor",
            got: t.ndim(),
        }))
    }
}

impl OpDescriptor {
    /// Check `attrs` against the operator's [`AttrKind`], fill in defaults and normalise axes.
    pub(crate) fn normalize_attrs(&self, operands: &[&TensorType], attrs: Attrs) -> Result<Attrs> {
        let ndim = operands.first().map_or(0, |t| t.ndim());
        let axis = |a: Option<isize>| -> Result<Option<isize>> {
            a.map(|a| shape::normalize_axis(a, ndim).map(|a| a as isize))
                .transpose()
                .map_err(|e| self.shape_error(e))
        };
        let invalid = |attrs: &Attrs| Error::Attributes {
            op: self.name,
            attrs: attrs.to_string(),
        };

        match (self.attrs, attrs) {
            (AttrKind::None, Attrs::None) => Ok(Attrs::None),
            (AttrKind::Axis { default }, Attrs::None) => Ok(Attrs::Axis(axis(default)?)),
            (AttrKind::Axis { .. }, Attrs::Axis(a)) => Ok(Attrs::Axis(axis(a)?)),
            (AttrKind::Shape, attrs @ Attrs::Shape(_)) => Ok(attrs),
            (AttrKind::Permutation { default_reverse: true }, Attrs::None) => {
                Ok(Attrs::Permutation((0..ndim).rev().collect()))
            }
            (AttrKind::Permutation { .. }, Attrs::Permutation(p)) => {
                shape::check_permutation(&p, ndim).map_err(|e| self.shape_error(e))?;
                Ok(Attrs::Permutation(p))
            }
            (AttrKind::Repeat, Attrs::Repeat { repeats, axis: a }) => Ok(Attrs::Repeat {
                repeats,
                axis: axis(a)?,
            }),
            (AttrKind::Index, Attrs::Index(specs)) => {
                if specs.len() > ndim {
                    return Err(self.shape_error(ShapeError::TooManyIndices {
                        given: specs.len(),
                        ndim,
                    }));
                }
                if specs
                    .iter()
                    .any(|s| matches!(s, IndexSpec::Slice { step: 0, .. }))
                {
                    return Err(self.shape_error(ShapeError::ZeroStep));
                }
                Ok(Attrs::Index(specs))
            }
            (_, attrs) => Err(invalid(&attrs)),
        }
    }

    pub(crate) fn infer_dtype(&self, operands: &[&TensorType]) -> Result<DType> {
        let first = operands.first().map_or(DType::Float64, |t| t.dtype);
        let promoted = || {
            operands
                .iter()
                .map(|t| t.dtype)
                .reduce(DType::promote)
                .unwrap_or(first)
        };
        Ok(match self.dtype {
            DTypeRule::Same => first,
            DTypeRule::FloatUpcast => first.float_upcast(),
            DTypeRule::Accumulator => first.accumulator(),
            DTypeRule::Int64 => DType::Int64,
            DTypeRule::Bool => DType::Bool,
            DTypeRule::Promote => promoted(),
            DTypeRule::TrueDiv => promoted().float_upcast(),
            DTypeRule::Bitwise => {
                if let Some(t) = operands.iter().find(|t| t.dtype.is_float()) {
                    return Err(Error::Type {
                        op: self.name,
                        message: format!("bitwise operators need bool or integer operands, got {}", t.dtype),
                    });
                }
                promoted()
            }
        })
    }

    /// Infer the result shape from normalised attributes.
    pub(crate) fn infer_shape(&self, operands: &[&TensorType], attrs: &Attrs) -> Result<Shape> {
        let err = |e: ShapeError| self.shape_error(e);
        let Some(x) = operands.first() else {
            return Ok(Shape::scalar());
        };
        let dims = x.shape.dims();

        match self.shape {
            ShapeRule::Same => Ok(x.shape.clone()),
            ShapeRule::Broadcast => operands[1..]
                .iter()
                .try_fold(x.shape.clone(), |acc, t| shape::broadcast(&acc, &t.shape))
                .map_err(err),
            ShapeRule::Reduce => match attrs {
                Attrs::Axis(Some(a)) => {
                    let mut dims = dims.to_vec();
                    dims.remove(*a as usize);
                    Ok(Shape(dims))
                }
                _ => Ok(Shape::scalar()),
            },
            ShapeRule::Scan => match attrs {
                Attrs::Axis(Some(_)) => Ok(x.shape.clone()),
                _ => Ok(Shape(vec![x.shape.numel().map_err(err)?.into()])),
            },
            ShapeRule::Trace => {
                require_matrix(self, x)?;
                Ok(Shape::scalar())
            }
            ShapeRule::Nonzero => Ok(Shape(vec![Dim::Fixed(x.ndim()), Dim::Unknown])),
            ShapeRule::NonzeroValues => Ok(Shape(vec![Dim::Unknown])),
            ShapeRule::Flatten => Ok(Shape(vec![x.shape.numel().map_err(err)?.into()])),
            ShapeRule::Reshape => match attrs {
                Attrs::Shape(target) => shape::reshape(&x.shape, target).map_err(err),
                _ => Ok(x.shape.clone()),
            },
            ShapeRule::Permute => match attrs {
                Attrs::Permutation(p) => Ok(Shape(shape::permute(dims, p))),
                _ => Ok(x.shape.clone()),
            },
            ShapeRule::Squeeze => self.infer_squeeze(&x.shape, attrs),
            ShapeRule::Diagonal => {
                require_matrix(self, x)?;
                let d = match (dims[0], dims[1]) {
                    (Dim::Fixed(r), Dim::Fixed(c)) => Dim::Fixed(r.min(c)),
                    (Dim::Fixed(0), _) | (_, Dim::Fixed(0)) => Dim::Fixed(0),
                    _ => Dim::Unknown,
                };
                Ok(Shape(vec![d]))
            }
            ShapeRule::Repeat => match attrs {
                Attrs::Repeat { repeats, axis } => {
                    shape::repeat(&x.shape, *repeats, *axis).map_err(err)
                }
                _ => Ok(x.shape.clone()),
            },
            ShapeRule::Index => match attrs {
                Attrs::Index(specs) => infer_index(&x.shape, specs).map_err(err),
                _ => Ok(x.shape.clone()),
            },
            ShapeRule::Dot => self.infer_dot(operands),
            ShapeRule::Matrix => {
                require_matrix(self, x)?;
                Ok(x.shape.clone())
            }
        }
    }

    fn infer_squeeze(&self, shape: &Shape, attrs: &Attrs) -> Result<Shape> {
        let dims = shape.dims();
        let drop: Vec<usize> = match attrs {
            Attrs::Axis(Some(a)) => {
                let a = *a as usize;
                match dims[a] {
                    Dim::Fixed(1) | Dim::Unknown => vec![a],
                    size => {
                        return Err(self.shape_error(ShapeError::Squeeze { axis: a, size }));
                    }
                }
            }
            _ => (0..dims.len())
                .filter(|&i| dims[i] == Dim::Fixed(1))
                .collect(),
        };
        Ok(Shape(
            dims.iter()
                .enumerate()
                .filter(|(i, _)| !drop.contains(i))
                .map(|(_, d)| *d)
                .collect(),
        ))
    }

    fn infer_dot(&self, operands: &[&TensorType]) -> Result<Shape> {
        let (a, b) = (&operands[0].shape, &operands[1].shape);
        for t in [a, b] {
            if !(1..=2).contains(&t.ndim()) {
                return Err(self.shape_error(ShapeError::Rank {
                    expected: "a 1-D or 2-D operand",
                    got: t.ndim(),
                }));
            }
        }
        let inner_a = a.dims()[a.ndim() - 1];
        let inner_b = b.dims()[0];
        if let (Dim::Fixed(x), Dim::Fixed(y)) = (inner_a, inner_b) {
            if x != y {
                return Err(self.shape_error(ShapeError::Mismatch {
                    what: "inner dimensions of dot",
                    lhs: a.clone(),
                    rhs: b.clone(),
                }));
            }
        }
        let mut dims = vec![];
        if a.ndim() == 2 {
            dims.push(a.dims()[0]);
        }
        if b.ndim() == 2 {
            dims.push(b.dims()[1]);
        }
        Ok(Shape(dims))
    }
}

/// Shape of an indexing expression; fixed dimensions are bounds-checked, unknown ones are checked
/// by the kernel.
fn infer_index(shape: &Shape, specs: &[IndexSpec]) -> core::result::Result<Shape, ShapeError> {
    let mut dims = Vec::with_capacity(shape.ndim());
    for (axis, &d) in shape.dims().iter().enumerate() {
        match (specs.get(axis).copied().unwrap_or(IndexSpec::full()), d) {
            (IndexSpec::At(i), Dim::Fixed(n)) => {
                IndexSpec::resolve_at(i, axis, n)?;
            }
            (IndexSpec::At(_), Dim::Unknown) => {}
            (IndexSpec::Slice { start, stop, step }, Dim::Fixed(n)) => {
                dims.push(Dim::Fixed(IndexSpec::resolve_slice(start, stop, step, n)?.len));
            }
            (IndexSpec::Slice { .. }, Dim::Unknown) => dims.push(Dim::Unknown),
        }
    }
    Ok(Shape(dims))
}
