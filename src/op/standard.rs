//! The built-in operators and their kernel tables.
use super::attrs::AttrKind;
use super::infer::{DTypeRule, ShapeRule};
use super::registry::{OpDescriptor, Registry, ReprRule};
use crate::kernel::dense::{self, Reduction, Scan};
use crate::kernel::scalar::{self, BinaryFn, UnaryFn};
use crate::kernel::{sparse, via_dense, Kernel};
use crate::types::Repr::{Dense, Sparse};

const DENSE: ReprRule = ReprRule::Always(Dense);
const SPARSE: ReprRule = ReprRule::Always(Sparse);

// (name, routine, result type, f(0) == 0)
const UNARY: &[(&str, UnaryFn, DTypeRule, bool)] = &[
    ("abs", f64::abs, DTypeRule::Same, true),
    ("neg", scalar::neg, DTypeRule::Same, true),
    ("sign", scalar::sign, DTypeRule::Same, true),
    ("ceil", f64::ceil, DTypeRule::Same, true),
    ("floor", f64::floor, DTypeRule::Same, true),
    ("trunc", f64::trunc, DTypeRule::Same, true),
    ("round", f64::round_ties_even, DTypeRule::Same, true),
    ("conj", scalar::identity, DTypeRule::Same, true),
    ("copy", scalar::identity, DTypeRule::Same, true),
    ("arcsin", f64::asin, DTypeRule::FloatUpcast, true),
    ("arctan", f64::atan, DTypeRule::FloatUpcast, true),
    ("arcsinh", f64::asinh, DTypeRule::FloatUpcast, true),
    ("arctanh", f64::atanh, DTypeRule::FloatUpcast, true),
    ("sin", f64::sin, DTypeRule::FloatUpcast, true),
    ("sinh", f64::sinh, DTypeRule::FloatUpcast, true),
    ("tan", f64::tan, DTypeRule::FloatUpcast, true),
    ("tanh", f64::tanh, DTypeRule::FloatUpcast, true),
    ("sqrt", f64::sqrt, DTypeRule::FloatUpcast, true),
    ("expm1", f64::exp_m1, DTypeRule::FloatUpcast, true),
    ("log1p", f64::ln_1p, DTypeRule::FloatUpcast, true),
    ("deg2rad", f64::to_radians, DTypeRule::FloatUpcast, true),
    ("rad2deg", f64::to_degrees, DTypeRule::FloatUpcast, true),
    ("arccos", f64::acos, DTypeRule::FloatUpcast, false),
    ("arccosh", f64::acosh, DTypeRule::FloatUpcast, false),
    ("cos", f64::cos, DTypeRule::FloatUpcast, false),
    ("cosh", f64::cosh, DTypeRule::FloatUpcast, false),
    ("exp", f64::exp, DTypeRule::FloatUpcast, false),
    ("exp2", f64::exp2, DTypeRule::FloatUpcast, false),
    ("log", f64::ln, DTypeRule::FloatUpcast, false),
    ("log10", f64::log10, DTypeRule::FloatUpcast, false),
    ("log2", f64::log2, DTypeRule::FloatUpcast, false),
    ("ones_like", scalar::one, DTypeRule::Same, false),
];

// (name, reduction, result type)
const REDUCTIONS: &[(&str, Reduction, DTypeRule)] = &[
    ("sum", Reduction::Sum, DTypeRule::Accumulator),
    ("prod", Reduction::Prod, DTypeRule::Accumulator),
    ("mean", Reduction::Mean, DTypeRule::FloatUpcast),
    ("var", Reduction::Var, DTypeRule::FloatUpcast),
    ("std", Reduction::Std, DTypeRule::FloatUpcast),
    ("min", Reduction::Min, DTypeRule::Same),
    ("max", Reduction::Max, DTypeRule::Same),
    ("argmin", Reduction::ArgMin, DTypeRule::Int64),
    ("argmax", Reduction::ArgMax, DTypeRule::Int64),
    ("ptp", Reduction::Ptp, DTypeRule::Same),
    ("any", Reduction::Any, DTypeRule::Bool),
    ("all", Reduction::All, DTypeRule::Bool),
];

// (name, routine, result type, f(0, 0) == 0)
const BINARY: &[(&str, BinaryFn, DTypeRule, bool)] = &[
    ("add", scalar::add, DTypeRule::Promote, true),
    ("sub", scalar::sub, DTypeRule::Promote, true),
    ("mul", scalar::mul, DTypeRule::Promote, true),
    ("and", scalar::and, DTypeRule::Bitwise, true),
    ("or", scalar::or, DTypeRule::Bitwise, true),
    ("xor", scalar::xor, DTypeRule::Bitwise, true),
    ("lt", scalar::lt, DTypeRule::Bool, true),
    ("gt", scalar::gt, DTypeRule::Bool, true),
    ("neq", scalar::neq, DTypeRule::Bool, true),
    ("le", scalar::le, DTypeRule::Bool, false),
    ("ge", scalar::ge, DTypeRule::Bool, false),
    ("eq", scalar::eq, DTypeRule::Bool, false),
    ("pow", scalar::pow, DTypeRule::Promote, false),
    ("mod", scalar::modulo, DTypeRule::Promote, false),
    ("floordiv", scalar::floordiv, DTypeRule::Promote, false),
    ("truediv", scalar::truediv, DTypeRule::TrueDiv, false),
];

/// A unary operator with a dense kernel and a sparse one, either structural or densifying.
fn unary_op(
    name: &'static str,
    dtype: DTypeRule,
    shape: ShapeRule,
    dense_kernel: Kernel,
    sparse_kernel: Option<(ReprRule, Kernel)>,
) -> OpDescriptor {
    let (rule, sparse_kernel) =
        sparse_kernel.unwrap_or_else(|| (DENSE, via_dense(dense_kernel.clone())));
    OpDescriptor::new(name, 1, dtype, shape)
        .with_kernel(&[Dense], DENSE, dense_kernel)
        .with_kernel(&[Sparse], rule, sparse_kernel)
}

fn axis(default: Option<isize>) -> AttrKind {
    AttrKind::Axis { default }
}

pub(crate) fn registry() -> Registry {
    let mut r = Registry::new();

    // Elementwise unary
    for &(name, f, dtype, zero_preserving) in UNARY {
        let structural = zero_preserving.then(|| (SPARSE, sparse::unary(f)));
        r.register(unary_op(name, dtype, ShapeRule::Same, dense::unary(f), structural));
    }
    r.register(unary_op(
        "zeros_like",
        DTypeRule::Same,
        ShapeRule::Same,
        dense::unary(scalar::zero),
        Some((SPARSE, sparse::zeros_like())),
    ));

    // Reductions and scans
    for &(name, reduction, dtype) in REDUCTIONS {
        let structural = (reduction == Reduction::Sum).then(|| (DENSE, sparse::sum()));
        r.register(
            unary_op(name, dtype, ShapeRule::Reduce, dense::reduce(reduction), structural)
                .with_attrs(axis(None)),
        );
    }
    for (name, s, dtype, default) in [
        ("cumsum", Scan::CumSum, DTypeRule::Accumulator, None),
        ("cumprod", Scan::CumProd, DTypeRule::Accumulator, None),
        ("argsort", Scan::ArgSort, DTypeRule::Int64, Some(-1)),
    ] {
        r.register(
            unary_op(name, dtype, ShapeRule::Scan, dense::scan(s), None).with_attrs(axis(default)),
        );
    }
    r.register(unary_op("trace", DTypeRule::Accumulator, ShapeRule::Trace, dense::trace(), None));
    r.register(unary_op("nonzero", DTypeRule::Int64, ShapeRule::Nonzero, dense::nonzero(), None));
    r.register(unary_op(
        "nonzero_values",
        DTypeRule::Same,
        ShapeRule::NonzeroValues,
        dense::nonzero_values(),
        None,
    ));

    // Shape transforms
    for name in ["flatten", "ravel"] {
        r.register(unary_op(name, DTypeRule::Same, ShapeRule::Flatten, dense::flatten(), None));
    }
    r.register(
        unary_op(
            "reshape",
            DTypeRule::Same,
            ShapeRule::Reshape,
            dense::reshape(),
            Some((ReprRule::SparseIfMatrix, sparse::reshape())),
        )
        .with_attrs(AttrKind::Shape),
    );
    for (name, default_reverse) in [("transpose", true), ("dimshuffle", false)] {
        r.register(
            unary_op(
                name,
                DTypeRule::Same,
                ShapeRule::Permute,
                dense::permute(),
                Some((SPARSE, sparse::permute())),
            )
            .with_attrs(AttrKind::Permutation { default_reverse }),
        );
    }
    r.register(
        unary_op(
            "squeeze",
            DTypeRule::Same,
            ShapeRule::Squeeze,
            dense::squeeze(),
            Some((ReprRule::SparseIfMatrix, sparse::squeeze())),
        )
        .with_attrs(axis(None)),
    );
    r.register(unary_op("diagonal", DTypeRule::Same, ShapeRule::Diagonal, dense::diagonal(), None));
    r.register(
        unary_op(
            "repeat",
            DTypeRule::Same,
            ShapeRule::Repeat,
            dense::repeat(),
            Some((ReprRule::SparseIfMatrix, sparse::repeat())),
        )
        .with_attrs(AttrKind::Repeat),
    );
    r.register(
        unary_op(
            "index",
            DTypeRule::Same,
            ShapeRule::Index,
            dense::index(),
            Some((ReprRule::SparseIfMatrix, sparse::index())),
        )
        .with_attrs(AttrKind::Index),
    );

    // Elementwise binary
    for &(name, f, dtype, zero_preserving) in BINARY {
        let dense_kernel = dense::binary(f);
        let mut op = OpDescriptor::new(name, 2, dtype, ShapeRule::Broadcast)
            .with_kernel(&[Dense, Dense], DENSE, dense_kernel.clone());
        op = if zero_preserving {
            op.with_kernel(&[Sparse, Sparse], SPARSE, sparse::merge(f))
        } else {
            op.with_kernel(&[Sparse, Sparse], DENSE, sparse::unstretched(via_dense(dense_kernel.clone())))
        };
        op = match name {
            "add" | "sub" => op
                .with_kernel(&[Dense, Sparse], DENSE, sparse::unstretched(via_dense(dense_kernel.clone())))
                .with_kernel(&[Sparse, Dense], DENSE, sparse::unstretched(via_dense(dense_kernel))),
            "mul" => op
                .with_kernel(&[Sparse, Dense], SPARSE, sparse::unstretched(sparse::mul_mixed(true)))
                .with_kernel(&[Dense, Sparse], SPARSE, sparse::unstretched(sparse::mul_mixed(false))),
            _ => op,
        };
        r.register(op);
    }

    // Matrix product
    r.register(
        OpDescriptor::new("dot", 2, DTypeRule::Promote, ShapeRule::Dot)
            .with_kernel(&[Dense, Dense], DENSE, dense::dot())
            .with_kernel(&[Sparse, Sparse], SPARSE, sparse::dot())
            .with_kernel(&[Sparse, Dense], DENSE, sparse::dot_mixed(true))
            .with_kernel(&[Dense, Sparse], DENSE, sparse::dot_mixed(false)),
    );

    // Representation conversion
    r.register(
        OpDescriptor::new("csr_from_dense", 1, DTypeRule::Same, ShapeRule::Matrix).with_kernel(
            &[Dense],
            SPARSE,
            dense::to_sparse(),
        ),
    );
    r.register(
        OpDescriptor::new("dense_from_sparse", 1, DTypeRule::Same, ShapeRule::Same).with_kernel(
            &[Sparse],
            DENSE,
            sparse::to_dense(),
        ),
    );

    r
}
