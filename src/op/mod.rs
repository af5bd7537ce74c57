//! Operator descriptors and the registry that maps operator names to them.
pub mod attrs;
pub mod infer;
pub mod registry;
mod standard;

pub use attrs::{AttrKind, Attrs, IndexSpec, ResolvedSlice};
pub use infer::{DTypeRule, ShapeRule};
pub use registry::{Implementation, OpDescriptor, Registry, ReprRule, Resolved};
