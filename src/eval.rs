//! Compiled plans and their invocation.
//!
//! A [`Plan`] owns everything it needs to run: the declared types of its inputs and a flat list
//! of steps, each carrying the kernel selected when its node was built. It holds no per-call
//! state, so one plan may be invoked from several threads at once.
use crate::error::{Error, KernelError, Result};
use crate::graph::{Graph, Node, NodeId};
use crate::kernel::{Kernel, KernelCtx};
use crate::op::Attrs;
use crate::types::{Repr, TensorType};
use crate::value::Value;

use core::fmt;
use std::borrow::Cow;
use std::collections::HashMap;

/// A formal parameter of a [`Plan`].
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub id: NodeId,
    pub name: String,
    pub ty: TensorType,
}

impl PlanInput {
    /// Check `value` against the declared type, casting it if its element type converts safely.
    fn bind<'v>(&self, position: usize, value: &'v Value) -> Result<Cow<'v, Value>> {
        let invalid = |message: String| Error::InvalidInput {
            position,
            name: self.name.clone(),
            message,
        };
        if value.repr() != self.ty.repr {
            return Err(invalid(format!(
                "expected a {} value, got a {} one",
                self.ty.repr,
                value.repr()
            )));
        }
        let shape = value.shape();
        if !self.ty.shape.admits(&shape) {
            return Err(invalid(format!(
                "shape {shape:?} does not fit the declared shape {}",
                self.ty.shape
            )));
        }
        if let Some(v) = value.first_inexact() {
            return Err(invalid(format!(
                "element {v} is outside the range of {} values held exactly",
                value.dtype()
            )));
        }
        let dtype = value.dtype();
        if dtype == self.ty.dtype {
            Ok(Cow::Borrowed(value))
        } else if dtype.can_cast_safely(self.ty.dtype) {
            Ok(Cow::Owned(value.cast(self.ty.dtype)))
        } else {
            Err(invalid(format!(
                "{dtype} values cannot be cast safely to {}",
                self.ty.dtype
            )))
        }
    }
}

/// One interior node, detached from its graph.
#[derive(Clone)]
pub(crate) struct Step {
    id: NodeId,
    op: &'static str,
    attrs: Attrs,
    operands: Vec<NodeId>,
    operand_types: Vec<TensorType>,
    output: TensorType,
    kernel: Kernel,
}

impl Step {
    pub(crate) fn from_node(graph: &Graph, node: &Node) -> Result<Step> {
        let origin = node
            .origin()
            .ok_or_else(|| Error::Internal(format!("{} has no origin to execute", node.id())))?;
        let operand_types = origin
            .operands
            .iter()
            .map(|&id| graph.node(id).map(|n| n.ty().clone()))
            .collect::<Result<Vec<_>>>()?;
        let recorded = operand_types.iter().map(|t| t.repr);
        if !recorded.eq(origin.reprs.iter().copied()) {
            return Err(Error::Internal(format!(
                "{} was dispatched for {:?}",
                node.id(),
                origin.reprs
            )));
        }
        Ok(Step {
            id: node.id(),
            op: origin.op,
            attrs: origin.attrs.clone(),
            operands: origin.operands.clone(),
            operand_types,
            output: node.ty().clone(),
            kernel: origin.kernel.clone(),
        })
    }

    fn run(&self, cache: &HashMap<NodeId, Cow<'_, Value>>) -> Result<Value> {
        let args = self
            .operands
            .iter()
            .map(|id| {
                cache
                    .get(id)
                    .map(|v| &**v)
                    .ok_or_else(|| Error::Internal(format!("{id} used before it was computed")))
            })
            .collect::<Result<Vec<&Value>>>()?;

        // Representations are fixed at build time; a mismatch means the plan is corrupt.
        for (arg, ty) in args.iter().zip(&self.operand_types) {
            if arg.repr() != ty.repr {
                return Err(self.repr_mismatch(ty.repr, arg.repr()));
            }
        }

        let ctx = KernelCtx {
            attrs: &self.attrs,
            operands: &self.operand_types,
            output: &self.output,
        };
        let out = (self.kernel)(&args, &ctx).map_err(|source| Error::Kernel {
            op: self.op,
            node: self.id,
            source,
        })?;
        if out.repr() != self.output.repr {
            return Err(self.repr_mismatch(self.output.repr, out.repr()));
        }
        if let Some(value) = out.first_inexact() {
            return Err(Error::Kernel {
                op: self.op,
                node: self.id,
                source: KernelError::InexactInteger {
                    dtype: out.dtype(),
                    value,
                },
            });
        }
        Ok(out)
    }

    fn repr_mismatch(&self, expected: Repr, got: Repr) -> Error {
        Error::Internal(format!(
            "`{}` at {} expected a {expected} value, got a {got} one",
            self.op, self.id
        ))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("op", &self.op)
            .field("attrs", &self.attrs)
            .field("operands", &self.operands)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// An immutable, reusable execution plan produced by [`Graph::compile`].
#[derive(Debug, Clone)]
pub struct Plan {
    inputs: Vec<PlanInput>,
    outputs: Vec<NodeId>,
    steps: Vec<Step>,
}

impl Plan {
    pub(crate) fn new(inputs: Vec<PlanInput>, outputs: Vec<NodeId>, steps: Vec<Step>) -> Self {
        Plan {
            inputs,
            outputs,
            steps,
        }
    }

    pub fn inputs(&self) -> &[PlanInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// The interior nodes in execution order.
    pub fn order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.steps.iter().map(|s| s.id)
    }

    /// Run the plan on `values`, matched positionally to [`Plan::inputs`].
    ///
    /// Every input is checked before any kernel runs. The first kernel failure aborts the call.
    pub fn invoke(&self, values: &[Value]) -> Result<Vec<Value>> {
        if values.len() != self.inputs.len() {
            return Err(Error::InputCount {
                expected: self.inputs.len(),
                got: values.len(),
            });
        }
        let bound = self
            .inputs
            .iter()
            .zip(values)
            .enumerate()
            .map(|(position, (input, value))| input.bind(position, value))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(inputs = bound.len(), steps = self.steps.len(), "invoking plan");
        let mut cache: HashMap<NodeId, Cow<'_, Value>> = self
            .inputs
            .iter()
            .map(|input| input.id)
            .zip(bound)
            .collect();

        for step in &self.steps {
            if cache.contains_key(&step.id) {
                continue;
            }
            let value = step.run(&cache)?;
            tracing::trace!(node = %step.id, op = step.op, "step done");
            cache.insert(step.id, Cow::Owned(value));
        }

        self.outputs
            .iter()
            .map(|id| {
                cache
                    .get(id)
                    .map(|v| (**v).clone())
                    .ok_or_else(|| Error::Internal(format!("output {id} was never computed")))
            })
            .collect()
    }
}
