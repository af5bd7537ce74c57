//! The reference kernel library: one pure function per (operator, operand representations).
//!
//! Kernels receive already-evaluated operand values together with a [`KernelCtx`] describing the
//! node being computed. They never see the graph.
pub mod dense;
pub mod scalar;
pub mod sparse;

use crate::error::KernelError;
use crate::op::Attrs;
use crate::types::{Repr, TensorType};
use crate::value::{CsrMatrix, DenseTensor, Value};

use std::sync::Arc;

/// Static information about the node a kernel computes.
#[derive(Debug, Clone, Copy)]
pub struct KernelCtx<'a> {
    pub attrs: &'a Attrs,
    /// Declared types of the operands.
    pub operands: &'a [TensorType],
    /// Declared type of the result.
    pub output: &'a TensorType,
}

pub type KernelFn = dyn Fn(&[&Value], &KernelCtx<'_>) -> Result<Value, KernelError> + Send + Sync;

/// A shareable kernel.
pub type Kernel = Arc<KernelFn>;

pub fn kernel(
    f: impl Fn(&[&Value], &KernelCtx<'_>) -> Result<Value, KernelError> + Send + Sync + 'static,
) -> Kernel {
    Arc::new(f)
}

/// Run `k` on the densified operands, then convert the result to the declared representation.
///
/// This is the generic sparse kernel for operators with no structural implementation.
pub fn via_dense(k: Kernel) -> Kernel {
    kernel(move |args, ctx| {
        let dense: Vec<Value> = args.iter().map(|v| Value::Dense(v.to_dense())).collect();
        let refs: Vec<&Value> = dense.iter().collect();
        let out = k(&refs, ctx)?;
        match ctx.output.repr {
            Repr::Dense => Ok(out),
            Repr::Sparse => Ok(Value::Sparse(CsrMatrix::from_dense(&out.to_dense())?)),
        }
    })
}

pub(crate) fn dense_arg<'a>(args: &[&'a Value], position: usize) -> Result<&'a DenseTensor, KernelError> {
    args.get(position)
        .and_then(|v| v.as_dense())
        .ok_or(KernelError::Operand {
            position,
            expected: Repr::Dense,
        })
}

pub(crate) fn sparse_arg<'a>(args: &[&'a Value], position: usize) -> Result<&'a CsrMatrix, KernelError> {
    args.get(position)
        .and_then(|v| v.as_sparse())
        .ok_or(KernelError::Operand {
            position,
            expected: Repr::Sparse,
        })
}
