//! The node arena.
//!
//! A [`Graph`] owns every node built in it. Nodes are addressed by [`NodeId`], never mutated
//! after creation, and only ever refer to nodes created before them, so the arena is acyclic by
//! construction.
use crate::compile::{compile, CompileOptions};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::eval::Plan;
use crate::kernel::Kernel;
use crate::op::{Attrs, Registry};
use crate::shape::{Shape, ShapeError};
use crate::types::{Repr, TensorType};

use core::fmt;
use std::sync::Arc;

/// Identity of a node in a [`Graph`]. Ids are handed out in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

/// How an interior node was produced.
#[derive(Clone)]
pub struct Origin {
    pub op: &'static str,
    /// Attributes after normalisation.
    pub attrs: Attrs,
    pub operands: Vec<NodeId>,
    /// Operand representations the kernel was selected for.
    pub reprs: Vec<Repr>,
    pub(crate) kernel: Kernel,
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Origin")
            .field("op", &self.op)
            .field("attrs", &self.attrs)
            .field("operands", &self.operands)
            .field("reprs", &self.reprs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    ty: TensorType,
    name: Option<String>,
    origin: Option<Origin>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn ty(&self) -> &TensorType {
        &self.ty
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `None` for placeholders.
    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin.is_none()
    }

    /// The name, or the id for anonymous nodes. Used in error messages.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }
}

/// An append-only arena of symbolic tensor nodes.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    registry: Arc<Registry>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// An empty graph over the built-in operators.
    pub fn new() -> Self {
        Self::with_registry(Registry::standard())
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Graph {
            nodes: vec![],
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Declare a placeholder: a leaf bound to data only when a plan is invoked.
    pub fn declare(
        &mut self,
        dtype: DType,
        shape: impl Into<Shape>,
        repr: Repr,
        name: Option<&str>,
    ) -> Result<NodeId> {
        let shape = shape.into();
        if repr == Repr::Sparse && shape.ndim() != 2 {
            return Err(Error::Config(format!(
                "sparse placeholders must be 2-D, got shape {shape}: {}",
                ShapeError::Rank {
                    expected: "a 2-D tensor",
                    got: shape.ndim(),
                }
            )));
        }
        let ty = TensorType { dtype, shape, repr };
        Ok(self.push(ty, name.map(str::to_string), None))
    }

    /// Apply the operator `op` to existing nodes, checking types and shapes and selecting the
    /// kernel for the operands' representations. Errors leave the graph unchanged.
    pub fn apply(&mut self, op: &str, operands: &[NodeId], attrs: Attrs) -> Result<NodeId> {
        let registry = Arc::clone(&self.registry);
        let descriptor = registry.get(op)?;
        let types = operands
            .iter()
            .map(|&id| self.node(id).map(Node::ty))
            .collect::<Result<Vec<_>>>()?;
        let resolved = descriptor.resolve(&types, attrs)?;
        let origin = Origin {
            op: descriptor.name,
            attrs: resolved.attrs,
            operands: operands.to_vec(),
            reprs: types.iter().map(|t| t.repr).collect(),
            kernel: resolved.kernel,
        };
        Ok(self.push(resolved.output, None, Some(origin)))
    }

    /// Compile the sub-graph computing `outputs` from `inputs` into a [`Plan`].
    pub fn compile(
        &self,
        inputs: &[NodeId],
        outputs: &[NodeId],
        options: &CompileOptions,
    ) -> Result<Plan> {
        compile(self, inputs, outputs, options)
    }

    fn push(&mut self, ty: TensorType, name: Option<String>, origin: Option<Origin>) -> NodeId {
        let id = NodeId(self.nodes.len());
        tracing::trace!(
            %id,
            op = origin.as_ref().map_or("placeholder", |o| o.op),
            ty = %ty,
            "node created"
        );
        self.nodes.push(Node {
            id,
            ty,
            name,
            origin,
        });
        id
    }
}
