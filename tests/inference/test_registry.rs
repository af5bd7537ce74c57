use crate::harness::{dense, kind_of};

use std::sync::Arc;
use symgraph::kernel::{dense as dense_kernels, kernel, KernelCtx};
use symgraph::op::{AttrKind, DTypeRule, OpDescriptor, ReprRule, ShapeRule};
use symgraph::prelude::*;
use symgraph::{Attrs, CompileOptions, ErrorKind, Graph, KernelError, Registry, Result};

#[test]
fn standard_registry_covers_the_operator_set() {
    let registry = Registry::standard();
    let expected = [
        "abs", "neg", "ceil", "floor", "trunc", "round", "sign", "arccos", "arcsin", "arctan",
        "arccosh", "arcsinh", "arctanh", "cos", "cosh", "sin", "sinh", "tan", "tanh", "deg2rad",
        "rad2deg", "exp", "exp2", "expm1", "log", "log10", "log1p", "log2", "sqrt", "conj",
        "copy", "zeros_like", "ones_like", "sum", "prod", "mean", "var", "std", "min", "max",
        "argmin", "argmax", "ptp", "any", "all", "cumsum", "cumprod", "trace", "argsort",
        "nonzero", "nonzero_values", "flatten", "ravel", "reshape", "transpose", "dimshuffle",
        "squeeze", "diagonal", "repeat", "index", "lt", "le", "gt", "ge", "eq", "neq", "and",
        "or", "xor", "add", "sub", "mul", "pow", "mod", "floordiv", "truediv", "dot",
        "csr_from_dense", "dense_from_sparse",
    ];
    for name in expected {
        let op = registry.get(name).unwrap();
        assert!(op.dispatch(&[Repr::Dense; 2][..op.arity]).is_ok() || name == "dense_from_sparse");
    }
    assert_eq!(registry.len(), expected.len());
}

#[test]
fn build_time_configuration_errors() -> Result<()> {
    let mut g = Graph::new();
    let x = g.declare(DType::Float64, [2, 3], Repr::Dense, Some("x"))?;

    assert_eq!(kind_of(g.apply("frobnicate", &[x], Attrs::None)), ErrorKind::Configuration);
    assert_eq!(kind_of(g.apply("add", &[x], Attrs::None)), ErrorKind::Configuration);
    assert_eq!(
        kind_of(g.apply("exp", &[x], Attrs::Axis(Some(0)))),
        ErrorKind::Configuration
    );
    assert_eq!(
        kind_of(g.apply("dimshuffle", &[x], Attrs::None)),
        ErrorKind::Configuration
    );
    assert_eq!(kind_of(g.apply("dense_from_sparse", &[x], Attrs::None)), ErrorKind::Representation);
    assert_eq!(g.len(), 1);
    Ok(())
}

#[test]
fn broadcasting_at_build_time() -> Result<()> {
    let mut g = Graph::new();
    let a = g.declare(DType::Float64, [2, 3], Repr::Dense, None)?;
    let b = g.declare(DType::Float64, [3], Repr::Dense, None)?;
    let c = g.declare(DType::Float64, [2, 1], Repr::Dense, None)?;
    let d = g.declare(DType::Float64, [4], Repr::Dense, None)?;

    let ab = g.apply("add", &[a, b], Attrs::None)?;
    assert_eq!(g.node(ab)?.ty().shape, Shape::fixed(&[2, 3]));
    let bc = g.apply("mul", &[b, c], Attrs::None)?;
    assert_eq!(g.node(bc)?.ty().shape, Shape::fixed(&[2, 3]));
    assert_eq!(kind_of(g.apply("sub", &[a, d], Attrs::None)), ErrorKind::Shape);
    Ok(())
}

#[test]
fn sparse_operands_do_not_stretch() -> Result<()> {
    let mut g = Graph::new();
    let a = g.declare(DType::Float64, [2, 3], Repr::Sparse, None)?;
    let b = g.declare(DType::Float64, [1, 3], Repr::Sparse, None)?;
    let c = g.declare(DType::Float64, [3], Repr::Dense, None)?;
    assert_eq!(kind_of(g.apply("add", &[a, b], Attrs::None)), ErrorKind::Shape);
    // A dense operand may still broadcast against a sparse one.
    let ac = g.apply("mul", &[a, c], Attrs::None)?;
    assert_eq!(g.node(ac)?.ty().repr, Repr::Sparse);

    // The rule holds for dense results too.
    let column = g.declare(DType::Float64, [2, 1], Repr::Sparse, None)?;
    let wide = g.declare(DType::Float64, [2, 3], Repr::Dense, None)?;
    let before = g.len();
    for op in ["add", "sub", "mul"] {
        assert_eq!(kind_of(g.apply(op, &[column, wide], Attrs::None)), ErrorKind::Shape);
        assert_eq!(kind_of(g.apply(op, &[wide, column], Attrs::None)), ErrorKind::Shape);
    }
    assert_eq!(kind_of(g.apply("eq", &[b, a], Attrs::None)), ErrorKind::Shape);
    assert_eq!(g.len(), before);
    let ad = g.apply("add", &[a, wide], Attrs::None)?;
    assert_eq!(g.node(ad)?.ty(), &TensorType::new(DType::Float64, [2, 3], Repr::Dense));
    Ok(())
}

#[test]
fn dot_shapes() -> Result<()> {
    let mut g = Graph::new();
    let a = g.declare(DType::Float64, [2, 3], Repr::Dense, None)?;
    let b = g.declare(DType::Float64, [3, 4], Repr::Sparse, None)?;
    let v = g.declare(DType::Float64, [3], Repr::Dense, None)?;
    let ab = g.apply("dot", &[a, b], Attrs::None)?;
    assert_eq!(g.node(ab)?.ty(), &TensorType::new(DType::Float64, [2, 4], Repr::Dense));
    let av = g.apply("dot", &[a, v], Attrs::None)?;
    assert_eq!(g.node(av)?.ty().shape, Shape::fixed(&[2]));
    assert_eq!(kind_of(g.apply("dot", &[b, a], Attrs::None)), ErrorKind::Shape);
    Ok(())
}

#[test]
fn custom_registries_extend_the_operator_set() -> Result<()> {
    let mut registry = Registry::standard().as_ref().clone();
    registry.register(
        OpDescriptor::new("clip01", 1, DTypeRule::Same, ShapeRule::Same)
            .with_kernel(&[Repr::Dense], ReprRule::Always(Repr::Dense), dense_kernels::unary(|v: f64| v.clamp(0.0, 1.0))),
    );
    registry.register(
        OpDescriptor::new("fails", 1, DTypeRule::Same, ShapeRule::Same)
            .with_attrs(AttrKind::None)
            .with_kernel(
                &[Repr::Dense],
                ReprRule::Always(Repr::Dense),
                kernel(|_: &[&Value], _: &KernelCtx<'_>| Err(KernelError::EmptyReduction)),
            ),
    );

    let mut g = Graph::with_registry(Arc::new(registry));
    let x = g.declare(DType::Float64, Shape::unknown(1), Repr::Dense, Some("x"))?;
    let y = g.apply("clip01", &[x], Attrs::None)?;
    let z = g.apply("fails", &[y], Attrs::None)?;

    let v = DenseTensor::from_vec(DType::Float64, vec![3], vec![-1.0, 0.5, 2.0]).unwrap();
    let plan = g.compile(&[x], &[y], &CompileOptions::default())?;
    assert_eq!(plan.invoke(&[dense(&v)])?[0].to_dense().data(), &[0.0, 0.5, 1.0]);

    let plan = g.compile(&[x], &[y, z], &CompileOptions::default())?;
    assert_eq!(kind_of(plan.invoke(&[dense(&v)])), ErrorKind::Kernel);
    Ok(())
}
