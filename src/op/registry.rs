use super::attrs::{AttrKind, Attrs};
use super::infer::{DTypeRule, ShapeRule};
use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::shape::{Dim, Shape, ShapeError};
use crate::types::{Repr, TensorType};

use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// How the representation of a result follows from its inferred shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReprRule {
    Always(Repr),
    /// Sparse when the result is 2-D, dense otherwise.
    SparseIfMatrix,
}

impl ReprRule {
    pub fn resolve(self, shape: &Shape) -> Repr {
        match self {
            ReprRule::Always(r) => r,
            ReprRule::SparseIfMatrix if shape.ndim() == 2 => Repr::Sparse,
            ReprRule::SparseIfMatrix => Repr::Dense,
        }
    }
}

/// The kernel registered for one combination of operand representations.
#[derive(Clone)]
pub struct Implementation {
    pub output: ReprRule,
    pub kernel: Kernel,
}

/// The result of applying an operator at build time.
#[derive(Clone)]
pub struct Resolved {
    pub attrs: Attrs,
    pub output: TensorType,
    pub kernel: Kernel,
}

/// An operator: its arity, attribute kind, inference rules, and kernel table keyed by the
/// representations of its operands.
#[derive(Clone)]
pub struct OpDescriptor {
    pub name: &'static str,
    pub arity: usize,
    pub attrs: AttrKind,
    pub dtype: DTypeRule,
    pub shape: ShapeRule,
    kernels: HashMap<Vec<Repr>, Implementation>,
}

impl OpDescriptor {
    pub fn new(name: &'static str, arity: usize, dtype: DTypeRule, shape: ShapeRule) -> Self {
        OpDescriptor {
            name,
            arity,
            attrs: AttrKind::None,
            dtype,
            shape,
            kernels: HashMap::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: AttrKind) -> Self {
        self.attrs = attrs;
        self
    }

    /// Register `kernel` for operands of representations `reprs`, replacing any previous entry.
    pub fn with_kernel(mut self, reprs: &[Repr], output: ReprRule, kernel: Kernel) -> Self {
        self.kernels
            .insert(reprs.to_vec(), Implementation { output, kernel });
        self
    }

    /// Representation combinations this operator has kernels for.
    pub fn supported(&self) -> impl Iterator<Item = &[Repr]> {
        self.kernels.keys().map(Vec::as_slice)
    }

    /// Select the implementation for the given operand representations.
    pub fn dispatch(&self, reprs: &[Repr]) -> Result<&Implementation> {
        self.kernels
            .get(reprs)
            .ok_or_else(|| Error::UnsupportedRepresentation {
                op: self.name,
                reprs: reprs.to_vec(),
            })
    }

    /// Check operands and attributes, infer the result type, and select the kernel.
    pub fn resolve(&self, operands: &[&TensorType], attrs: Attrs) -> Result<Resolved> {
        if operands.len() != self.arity {
            return Err(Error::Arity {
                op: self.name,
                expected: self.arity,
                got: operands.len(),
            });
        }
        let reprs: Vec<Repr> = operands.iter().map(|t| t.repr).collect();
        let implementation = self.dispatch(&reprs)?;

        let attrs = self.normalize_attrs(operands, attrs)?;
        let dtype = self.infer_dtype(operands)?;
        let shape = self.infer_shape(operands, &attrs)?;
        let repr = implementation.output.resolve(&shape);

        if repr == Repr::Sparse && shape.ndim() != 2 {
            return Err(self.shape_error(ShapeError::Rank {
                expected: "a 2-D sparse result",
                got: shape.ndim(),
            }));
        }
        self.check_unstretched(operands, &shape)?;

        Ok(Resolved {
            attrs,
            output: TensorType { dtype, shape, repr },
            kernel: implementation.kernel.clone(),
        })
    }

    // Sparse operands of elementwise operators do not stretch, whatever the result repr.
    fn check_unstretched(&self, operands: &[&TensorType], shape: &Shape) -> Result<()> {
        if self.shape != ShapeRule::Broadcast {
            return Ok(());
        }
        for t in operands.iter().filter(|t| t.repr == Repr::Sparse) {
            let stretched = t.shape.ndim() != shape.ndim()
                || t.shape.dims().iter().zip(shape.dims()).any(|(a, b)| match (a, b) {
                    (Dim::Fixed(x), Dim::Fixed(y)) => x != y,
                    _ => false,
                });
            if stretched {
                return Err(self.shape_error(ShapeError::Mismatch {
                    what: "sparse operands cannot be broadcast",
                    lhs: t.shape.clone(),
                    rhs: shape.clone(),
                }));
            }
        }
        Ok(())
    }

    pub(crate) fn shape_error(&self, source: ShapeError) -> Error {
        Error::Shape {
            op: self.name,
            source,
        }
    }
}

/// Maps operator names to their descriptors.
#[derive(Clone, Default)]
pub struct Registry {
    ops: HashMap<&'static str, OpDescriptor>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry holding every built-in operator.
    pub fn standard() -> Arc<Registry> {
        static STANDARD: OnceLock<Arc<Registry>> = OnceLock::new();
        STANDARD
            .get_or_init(|| Arc::new(super::standard::registry()))
            .clone()
    }

    pub fn register(&mut self, op: OpDescriptor) {
        self.ops.insert(op.name, op);
    }

    pub fn get(&self, name: &str) -> Result<&OpDescriptor> {
        self.ops
            .get(name)
            .ok_or_else(|| Error::UnknownOperator(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ops.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}
