use crate::harness::{assert_same, assert_transparent, evaluate, kind_of};
use crate::strategy::{arb_dot_pair, arb_matrix_and_row, arb_matrix_pair};

use proptest::prelude::*;
use symgraph::prelude::*;
use symgraph::{ErrorKind, Result};

type BinaryMethod = fn(&Var, &Var) -> Result<Var>;

const ARITHMETIC: &[(&str, BinaryMethod)] = &[
    ("add", Var::add),
    ("sub", Var::sub),
    ("mul", Var::mul),
    ("pow", Var::pow),
    ("mod", Var::modulo),
    ("floordiv", Var::floordiv),
    ("truediv", Var::truediv),
    ("lt", Var::lt),
    ("le", Var::le),
    ("gt", Var::gt),
    ("ge", Var::ge),
    ("eq", Var::equal),
    ("neq", Var::not_equal),
];

const BITWISE: &[(&str, BinaryMethod)] = &[("and", Var::and), ("or", Var::or), ("xor", Var::xor)];

proptest! {
    #[test]
    fn float_binary_is_transparent((x, y) in arb_matrix_pair(DType::Float64, 4)) {
        for &(name, method) in ARITHMETIC {
            assert_transparent(name, &[&x, &y], |v| method(&v[0], &v[1]));
        }
    }

    // Integer division by zero and negative powers fail the same way in both representations.
    #[test]
    fn integer_binary_is_transparent((x, y) in arb_matrix_pair(DType::Int64, 4)) {
        for &(name, method) in ARITHMETIC.iter().chain(BITWISE) {
            assert_transparent(name, &[&x, &y], |v| method(&v[0], &v[1]));
        }
    }

    #[test]
    fn mixed_kernels_agree_with_dense((x, y) in arb_matrix_pair(DType::Float64, 4)) {
        let mixed: &[(&str, BinaryMethod)] = &[("add", Var::add), ("sub", Var::sub), ("mul", Var::mul)];
        for &(name, method) in mixed {
            let f = |v: &[Var]| method(&v[0], &v[1]);
            let expected = evaluate(&[(Repr::Dense, &x), (Repr::Dense, &y)], f);
            assert_same(name, &expected, &evaluate(&[(Repr::Sparse, &x), (Repr::Dense, &y)], f));
            assert_same(name, &expected, &evaluate(&[(Repr::Dense, &x), (Repr::Sparse, &y)], f));
        }
    }

    #[test]
    fn sparse_times_broadcast_row((x, row) in arb_matrix_and_row(DType::Float64, 4)) {
        let f = |v: &[Var]| v[0].mul(&v[1]);
        let expected = evaluate(&[(Repr::Dense, &x), (Repr::Dense, &row)], f);
        assert_same("mul", &expected, &evaluate(&[(Repr::Sparse, &x), (Repr::Dense, &row)], f));
    }

    #[test]
    fn dot_is_transparent((a, b) in arb_dot_pair(DType::Float64, 4)) {
        let f = |v: &[Var]| v[0].dot(&v[1]);
        let expected = evaluate(&[(Repr::Dense, &a), (Repr::Dense, &b)], f);
        for reprs in [[Repr::Sparse, Repr::Sparse], [Repr::Sparse, Repr::Dense], [Repr::Dense, Repr::Sparse]] {
            let actual = evaluate(&[(reprs[0], &a), (reprs[1], &b)], f);
            assert_same(&format!("dot {reprs:?}"), &expected, &actual);
        }
    }

    #[test]
    fn broadcasting_matches_elementwise_definition((x, row) in arb_matrix_and_row(DType::Float64, 4)) {
        let out = evaluate(&[(Repr::Dense, &x), (Repr::Dense, &row)], |v| &v[0] + &v[1]).unwrap();
        let cols = row.len();
        for (i, &got) in out.data().iter().enumerate() {
            let want = x.data()[i] + row.data()[i % cols];
            prop_assert!(got == want || (got.is_nan() && want.is_nan()), "{} != {}", got, want);
        }
    }
}

#[test]
fn result_representations() -> Result<()> {
    let g = new_graph();
    let d = dmatrix(&g, "d")?;
    let s = csr_dmatrix(&g, "s")?;
    let t = csr_dmatrix(&g, "t")?;

    assert_eq!(s.add(&t)?.repr(), Repr::Sparse);
    assert_eq!(s.lt(&t)?.repr(), Repr::Sparse);
    assert_eq!(s.le(&t)?.repr(), Repr::Dense);
    assert_eq!(s.truediv(&t)?.repr(), Repr::Dense);
    assert_eq!(s.dot(&t)?.repr(), Repr::Sparse);

    assert_eq!(s.add(&d)?.repr(), Repr::Dense);
    assert_eq!(d.sub(&s)?.repr(), Repr::Dense);
    assert_eq!(d.mul(&s)?.repr(), Repr::Sparse);
    assert_eq!(s.dot(&d)?.repr(), Repr::Dense);
    Ok(())
}

#[test]
fn unsupported_mixed_combinations_fail_at_build_time() -> Result<()> {
    let g = new_graph();
    let d = dmatrix(&g, "d")?;
    let s = csr_dmatrix(&g, "s")?;
    let before = g.borrow().len();
    for r in [d.le(&s), s.truediv(&d), d.pow(&s), s.equal(&d)] {
        assert_eq!(kind_of(r), ErrorKind::Representation);
    }
    assert_eq!(g.borrow().len(), before);
    Ok(())
}

#[test]
fn element_type_rules() -> Result<()> {
    let g = new_graph();
    let i = imatrix(&g, "i")?;
    let l = lmatrix(&g, "l")?;
    let f = fmatrix(&g, "f")?;
    let d = dmatrix(&g, "d")?;

    assert_eq!(i.add(&l)?.dtype(), DType::Int64);
    assert_eq!(f.add(&d)?.dtype(), DType::Float64);
    assert_eq!(i.lt(&l)?.dtype(), DType::Bool);
    assert_eq!(i.xor(&l)?.dtype(), DType::Int64);
    assert_eq!(i.truediv(&i)?.dtype(), DType::Float64);
    assert_eq!(kind_of(f.and(&i)), ErrorKind::Type);
    Ok(())
}

#[test]
fn integer_division_by_zero_is_a_kernel_error() {
    let x = DenseTensor::matrix(DType::Int64, &[[1, 2]]);
    let y = DenseTensor::matrix(DType::Int64, &[[1, 0]]);
    for reprs in [[Repr::Dense, Repr::Dense], [Repr::Sparse, Repr::Sparse]] {
        let r = evaluate(&[(reprs[0], &x), (reprs[1], &y)], |v| v[0].floordiv(&v[1]));
        assert_eq!(kind_of(r), ErrorKind::Kernel);
    }

    // Floats follow IEEE instead.
    let x = x.cast(DType::Float64);
    let y = y.cast(DType::Float64);
    let out = evaluate(&[(Repr::Dense, &x), (Repr::Dense, &y)], |v| v[0].floordiv(&v[1])).unwrap();
    assert_eq!(out.data(), &[1.0, f64::INFINITY]);
}

#[test]
fn implicit_zeros_meet_non_finite_values() {
    let a = DenseTensor::matrix(DType::Float64, &[[0.0, 1.0]]);
    let b = DenseTensor::matrix(DType::Float64, &[[f64::INFINITY, 2.0]]);
    let col = DenseTensor::matrix(DType::Float64, &[[f64::NAN], [2.0]]);
    let all = [[Repr::Sparse, Repr::Dense], [Repr::Dense, Repr::Sparse], [Repr::Sparse, Repr::Sparse]];

    let mul = |v: &[Var]| v[0].mul(&v[1]);
    let expected = evaluate(&[(Repr::Dense, &a), (Repr::Dense, &b)], mul);
    assert!(expected.as_ref().unwrap().data()[0].is_nan());
    for reprs in all {
        let actual = evaluate(&[(reprs[0], &a), (reprs[1], &b)], mul);
        assert_same(&format!("mul {reprs:?}"), &expected, &actual);
    }

    // 0 * NaN + 1 * 2 is NaN.
    let dot = |v: &[Var]| v[0].dot(&v[1]);
    for rhs in [&col, &b.clone().reshaped(vec![2, 1])] {
        let expected = evaluate(&[(Repr::Dense, &a), (Repr::Dense, rhs)], dot);
        assert!(expected.as_ref().unwrap().data()[0].is_nan());
        for reprs in all {
            let actual = evaluate(&[(reprs[0], &a), (reprs[1], rhs)], dot);
            assert_same(&format!("dot {reprs:?}"), &expected, &actual);
        }
    }
}

#[test]
fn sparse_operands_never_stretch_at_runtime() -> Result<()> {
    let column = DenseTensor::matrix(DType::Float64, &[[1.0], [0.0]]);
    let wide = DenseTensor::matrix(DType::Float64, &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);

    // Dense operands broadcast as usual.
    let add = |v: &[Var]| &v[0] + &v[1];
    assert_eq!(evaluate(&[(Repr::Dense, &column), (Repr::Dense, &wide)], add)?.shape(), &[2, 3]);
    for method in [Var::add as BinaryMethod, Var::sub, Var::mul] {
        for reprs in [[Repr::Sparse, Repr::Dense], [Repr::Dense, Repr::Sparse]] {
            let (x, y) = if reprs[0] == Repr::Sparse { (&column, &wide) } else { (&wide, &column) };
            let r = evaluate(&[(reprs[0], x), (reprs[1], y)], |v| method(&v[0], &v[1]));
            assert_eq!(kind_of(r), ErrorKind::Kernel);
        }
    }
    let ge = |v: &[Var]| v[0].ge(&v[1]);
    let row = DenseTensor::matrix(DType::Float64, &[[1.0, 0.0, 2.0]]);
    let r = evaluate(&[(Repr::Sparse, &row), (Repr::Sparse, &wide)], ge);
    assert_eq!(kind_of(r), ErrorKind::Kernel);
    Ok(())
}
