use crate::compile::CompileOptions;
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::eval::Plan;
use crate::graph::{Graph, NodeId};
use crate::op::{Attrs, IndexSpec};
use crate::shape::Shape;
use crate::types::{Repr, TensorType};

use std::cell::RefCell;
use std::rc::Rc;

/// A graph shared between the [`Var`]s built in it.
pub type SharedGraph = Rc<RefCell<Graph>>;

/// A fresh empty graph over the built-in operators.
pub fn new_graph() -> SharedGraph {
    Rc::new(RefCell::new(Graph::new()))
}

/// A handle to one node of a shared graph.
///
/// Every method builds a new node and returns a handle to it; the receiver is never changed.
#[derive(Clone, Debug)]
pub struct Var {
    state: SharedGraph,
    id: NodeId,
}

impl Var {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.state
    }

    /// Declare a placeholder in `state`.
    pub fn placeholder(
        state: &SharedGraph,
        name: &str,
        dtype: DType,
        shape: impl Into<Shape>,
        repr: Repr,
    ) -> Result<Var> {
        let id = state.borrow_mut().declare(dtype, shape, repr, Some(name))?;
        Ok(Var {
            state: Rc::clone(state),
            id,
        })
    }

    pub fn ty(&self) -> TensorType {
        self.with_node(|n| n.ty().clone())
    }

    pub fn dtype(&self) -> DType {
        self.with_node(|n| n.ty().dtype)
    }

    pub fn shape(&self) -> Shape {
        self.with_node(|n| n.ty().shape.clone())
    }

    pub fn repr(&self) -> Repr {
        self.with_node(|n| n.ty().repr)
    }

    pub fn name(&self) -> Option<String> {
        self.with_node(|n| n.name().map(str::to_string))
    }

    /// The operator that produced this node, `None` for placeholders.
    pub fn op(&self) -> Option<&'static str> {
        self.with_node(|n| n.origin().map(|o| o.op))
    }

    /// Handles to the operands this node was built from.
    pub fn operands(&self) -> Vec<Var> {
        let ids = self.with_node(|n| n.origin().map(|o| o.operands.clone()).unwrap_or_default());
        ids.into_iter()
            .map(|id| Var {
                state: Rc::clone(&self.state),
                id,
            })
            .collect()
    }

    fn with_node<T>(&self, f: impl FnOnce(&crate::graph::Node) -> T) -> T {
        let graph = self.state.borrow();
        match graph.node(self.id) {
            Ok(node) => f(node),
            // A Var is only ever created for a node of its own graph.
            Err(_) => unreachable!("{} is not in its graph", self.id),
        }
    }

    fn same_graph(&self, other: &Var) -> Result<()> {
        if Rc::ptr_eq(&self.state, &other.state) {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "{} and {} belong to different graphs",
                self.id, other.id
            )))
        }
    }

    /// Apply `op` to `self` followed by `others`.
    pub fn apply(&self, op: &str, others: &[&Var], attrs: Attrs) -> Result<Var> {
        let mut operands = vec![self.id];
        for other in others {
            self.same_graph(other)?;
            operands.push(other.id);
        }
        let id = self.state.borrow_mut().apply(op, &operands, attrs)?;
        Ok(Var {
            state: Rc::clone(&self.state),
            id,
        })
    }

    fn unary(&self, op: &str) -> Result<Var> {
        self.apply(op, &[], Attrs::None)
    }

    fn binary(&self, op: &str, rhs: &Var) -> Result<Var> {
        self.apply(op, &[rhs], Attrs::None)
    }

    fn along(&self, op: &str, axis: Option<isize>) -> Result<Var> {
        match axis {
            Some(a) => self.apply(op, &[], Attrs::Axis(Some(a))),
            None => self.apply(op, &[], Attrs::None),
        }
    }
}

macro_rules! unary_methods {
    ($($method:ident => $op:literal),* $(,)?) => {
        impl Var {
            $(
                #[doc = concat!("Elementwise `", $op, "`.")]
                pub fn $method(&self) -> Result<Var> {
                    self.unary($op)
                }
            )*
        }
    };
}

unary_methods! {
    abs => "abs", neg => "neg", sign => "sign",
    ceil => "ceil", floor => "floor", trunc => "trunc", round => "round",
    arccos => "arccos", arcsin => "arcsin", arctan => "arctan",
    arccosh => "arccosh", arcsinh => "arcsinh", arctanh => "arctanh",
    cos => "cos", cosh => "cosh", sin => "sin", sinh => "sinh", tan => "tan", tanh => "tanh",
    deg2rad => "deg2rad", rad2deg => "rad2deg",
    exp => "exp", exp2 => "exp2", expm1 => "expm1",
    log => "log", log10 => "log10", log1p => "log1p", log2 => "log2",
    sqrt => "sqrt", conj => "conj", copy => "copy",
    zeros_like => "zeros_like", ones_like => "ones_like",
}

macro_rules! axis_methods {
    ($($method:ident => $op:literal),* $(,)?) => {
        impl Var {
            $(
                #[doc = concat!("`", $op, "` along `axis`, or over all elements when `axis` is `None`.")]
                pub fn $method(&self, axis: Option<isize>) -> Result<Var> {
                    self.along($op, axis)
                }
            )*
        }
    };
}

axis_methods! {
    sum => "sum", prod => "prod", mean => "mean", var => "var", std => "std",
    min => "min", max => "max", argmin => "argmin", argmax => "argmax", ptp => "ptp",
    any => "any", all => "all", cumsum => "cumsum", cumprod => "cumprod",
}

macro_rules! binary_methods {
    ($($method:ident => $op:literal),* $(,)?) => {
        impl Var {
            $(
                #[doc = concat!("Elementwise `", $op, "` with broadcasting.")]
                pub fn $method(&self, rhs: &Var) -> Result<Var> {
                    self.binary($op, rhs)
                }
            )*
        }
    };
}

binary_methods! {
    lt => "lt", le => "le", gt => "gt", ge => "ge", equal => "eq", not_equal => "neq",
    and => "and", or => "or", xor => "xor",
    add => "add", sub => "sub", mul => "mul", pow => "pow",
    modulo => "mod", floordiv => "floordiv", truediv => "truediv",
}

impl Var {
    /// Indices that sort `x` along `axis` (the last one when `None`).
    pub fn argsort(&self, axis: Option<isize>) -> Result<Var> {
        self.along("argsort", axis)
    }

    pub fn trace(&self) -> Result<Var> {
        self.unary("trace")
    }

    /// Coordinates of the nonzero elements, one row per axis.
    pub fn nonzero(&self) -> Result<Var> {
        self.unary("nonzero")
    }

    pub fn nonzero_values(&self) -> Result<Var> {
        self.unary("nonzero_values")
    }

    pub fn flatten(&self) -> Result<Var> {
        self.unary("flatten")
    }

    pub fn ravel(&self) -> Result<Var> {
        self.unary("ravel")
    }

    /// At most one entry of `shape` may be `-1`.
    pub fn reshape(&self, shape: &[isize]) -> Result<Var> {
        self.apply("reshape", &[], Attrs::Shape(shape.to_vec()))
    }

    /// Reverse the axes.
    pub fn transpose(&self) -> Result<Var> {
        self.unary("transpose")
    }

    pub fn dimshuffle(&self, perm: &[usize]) -> Result<Var> {
        self.apply("dimshuffle", &[], Attrs::Permutation(perm.to_vec()))
    }

    /// Drop `axis`, or every axis declared with size 1.
    pub fn squeeze(&self, axis: Option<isize>) -> Result<Var> {
        self.along("squeeze", axis)
    }

    pub fn diagonal(&self) -> Result<Var> {
        self.unary("diagonal")
    }

    /// Repeat each element `repeats` times along `axis`, or over the flattened tensor.
    pub fn repeat(&self, repeats: usize, axis: Option<isize>) -> Result<Var> {
        self.apply("repeat", &[], Attrs::Repeat { repeats, axis })
    }

    /// Basic indexing: one [`IndexSpec`] per leading axis, trailing axes are kept whole.
    pub fn index(&self, specs: &[IndexSpec]) -> Result<Var> {
        self.apply("index", &[], Attrs::Index(specs.to_vec()))
    }

    /// `(self // rhs, self % rhs)`.
    pub fn divmod(&self, rhs: &Var) -> Result<(Var, Var)> {
        Ok((self.floordiv(rhs)?, self.modulo(rhs)?))
    }

    pub fn dot(&self, rhs: &Var) -> Result<Var> {
        self.binary("dot", rhs)
    }

    /// Convert a dense matrix to the sparse representation.
    pub fn to_sparse(&self) -> Result<Var> {
        self.unary("csr_from_dense")
    }

    pub fn to_dense(&self) -> Result<Var> {
        self.unary("dense_from_sparse")
    }
}

/// Compile the graph shared by `inputs` and `outputs` into a [`Plan`].
pub fn function(inputs: &[&Var], outputs: &[&Var], options: CompileOptions) -> Result<Plan> {
    let Some(first) = inputs.iter().chain(outputs).next() else {
        return Err(Error::Config("a plan needs at least one output".into()));
    };
    for v in inputs.iter().chain(outputs) {
        first.same_graph(v)?;
    }
    let ids = |vars: &[&Var]| vars.iter().map(|v| v.id).collect::<Vec<_>>();
    let graph = first.state.borrow();
    graph.compile(&ids(inputs), &ids(outputs), &options)
}
