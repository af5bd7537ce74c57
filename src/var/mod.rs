//! A method-call interface for building graphs.
//!
//! A [`Var`] is a handle to a node of a [`SharedGraph`]; calling a method on it builds a new
//! node. The arithmetic and bitwise operators are overloaded too, returning `Result<Var>` since
//! building a node can fail:
//!
//! ```rust
//! use symgraph::prelude::*;
//!
//! # fn main() -> symgraph::Result<()> {
//! let g = new_graph();
//! let x = dmatrix(&g, "x")?;
//! let y = dmatrix(&g, "y")?;
//! let z = ((&x + &y)? * x.exp()?)?;
//! assert_eq!(z.op(), Some("mul"));
//! assert_eq!(z.operands()[0].op(), Some("add"));
//! # Ok(())
//! # }
//! ```
//!
//! The constructors named after their element type (`dmatrix`, `lvector`, `fscalar`, ...)
//! declare dense placeholders with unknown dimensions; the `csr_` ones declare sparse matrices.

mod constructors;
mod operators;
mod var;

pub use constructors::*;
pub use var::*;
