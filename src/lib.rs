//! # symgraph
//!
//! Symbolic expression graphs over dense and sparse tensors.
//!
//! Computations are described as a [`Graph`] of typed placeholders and operator applications,
//! compiled once into a [`Plan`], and then invoked any number of times on concrete [`Value`]s.
//! Dense tensors and sparse (CSR) matrices expose the same operators: the kernel that runs is
//! chosen from the operands' [representations](Repr) when a node is built, so a graph written
//! for dense placeholders works unchanged when they are declared sparse.
//!
//! ```rust
//! use symgraph::prelude::*;
//!
//! # fn main() -> symgraph::Result<()> {
//! let g = new_graph();
//! let x = dmatrix(&g, "x")?;
//! let z = x.transpose()?;
//! let f = function(&[&x], &[&z], CompileOptions::default())?;
//!
//! let out = f.invoke(&[DenseTensor::matrix(DType::Float64, &[[1.1, 0.0, 2.0], [-1.0, 0.0, 0.0]]).into()])?;
//! assert_eq!(
//!     out[0].to_dense().to_rows(),
//!     Some(vec![vec![1.1, -1.0], vec![0.0, 0.0], vec![2.0, 0.0]])
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - [`Graph`] is an append-only arena of nodes addressed by [`NodeId`]. [`Graph::declare`]
//!   adds placeholders and [`Graph::apply`] adds operator applications, checking element types,
//!   shapes and representations as it goes.
//! - The [`Registry`](op::Registry) maps operator names to descriptors holding their inference
//!   rules and a kernel table keyed by operand representations.
//! - [`Graph::compile`] orders the nodes an output set depends on; [`Plan::invoke`] runs them.
//! - [`Var`] wraps a shared graph with one method per operator and the usual `std::ops`.
//!
//! Build-time and run-time failures are reported through [`Error`], see [`Error::kind`].

pub mod dtype;
pub mod shape;
pub mod types;
pub mod value;

pub mod error;
pub mod kernel;
pub mod op;

pub mod compile;
pub mod eval;
pub mod graph;

pub mod var;

pub use compile::{CompileOptions, OnUnusedInput};
pub use dtype::DType;
pub use error::{Error, ErrorKind, KernelError, Result};
pub use eval::Plan;
pub use graph::{Graph, NodeId};
pub use op::{Attrs, IndexSpec, Registry};
pub use shape::{Dim, Shape};
pub use types::{Repr, TensorType};
pub use value::{CsrMatrix, DenseTensor, Value, ValueError};
pub use var::{function, new_graph, Var};

pub mod prelude {
    //! Everything needed to build, compile and run graphs through [`Var`]s.
    pub use crate::var::*;
    pub use crate::{
        CompileOptions, CsrMatrix, DType, DenseTensor, Dim, IndexSpec, OnUnusedInput, Repr,
        Shape, TensorType, Value,
    };
}
