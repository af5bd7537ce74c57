use crate::harness::{assert_transparent, evaluate, kind_of};
use crate::strategy::arb_matrix;

use proptest::prelude::*;
use symgraph::prelude::*;
use symgraph::{ErrorKind, Result};

fn slice(start: Option<isize>, stop: Option<isize>, step: isize) -> IndexSpec {
    IndexSpec::slice(start, stop, step)
}

proptest! {
    #[test]
    fn shape_ops_are_transparent(x in arb_matrix(DType::Float64, 4)) {
        let [rows, cols] = [x.shape()[0] as isize, x.shape()[1] as isize];

        assert_transparent("flatten", &[&x], |v| v[0].flatten());
        assert_transparent("ravel", &[&x], |v| v[0].ravel());
        assert_transparent("transpose", &[&x], |v| v[0].transpose());
        assert_transparent("dimshuffle", &[&x], |v| v[0].dimshuffle(&[1, 0]));
        assert_transparent("dimshuffle id", &[&x], |v| v[0].dimshuffle(&[0, 1]));
        assert_transparent("reshape 2-D", &[&x], |v| v[0].reshape(&[cols, rows]));
        assert_transparent("reshape -1", &[&x], |v| v[0].reshape(&[-1, 1]));
        assert_transparent("reshape 1-D", &[&x], |v| v[0].reshape(&[-1]));
        assert_transparent("squeeze", &[&x], |v| v[0].squeeze(None));
        assert_transparent("diagonal", &[&x], |v| v[0].diagonal());
        for axis in [Some(0), Some(1), Some(-1), None] {
            assert_transparent("repeat", &[&x], |v| v[0].repeat(3, axis));
        }
    }

    #[test]
    fn indexing_is_transparent(x in arb_matrix(DType::Float64, 4)) {
        let cases: Vec<Vec<IndexSpec>> = vec![
            vec![],
            vec![(1..).into()],
            vec![slice(None, None, -1)],
            vec![(..).into(), slice(None, None, 2)],
            vec![slice(Some(-1), None, -2), (..1).into()],
            vec![(0..10).into(), slice(Some(5), Some(-10), -1)],
            vec![0.into()],
            vec![(..).into(), (-1).into()],
            vec![(-1).into(), 0.into()],
        ];
        for specs in cases {
            assert_transparent(&format!("index {specs:?}"), &[&x], |v| v[0].index(&specs));
        }
    }
}

#[test]
fn reshape_preserves_the_element_count_at_build_time() -> Result<()> {
    for repr in [Repr::Dense, Repr::Sparse] {
        let g = new_graph();
        let x = Var::placeholder(&g, "x", DType::Float64, [2, 3], repr)?;
        let ok = x.reshape(&[3, 2])?;
        assert_eq!(ok.shape(), Shape::fixed(&[3, 2]));
        assert_eq!(ok.repr(), repr);
        assert_eq!(kind_of(x.reshape(&[4, 2])), ErrorKind::Shape);
        assert_eq!(kind_of(x.reshape(&[-1, -1])), ErrorKind::Shape);
        assert_eq!(x.reshape(&[-1])?.shape(), Shape::fixed(&[6]));
        assert_eq!(x.reshape(&[-1])?.repr(), Repr::Dense);
    }
    Ok(())
}

#[test]
fn reshape_runs_after_build_time_checks() -> Result<()> {
    let x = DenseTensor::matrix(DType::Float64, &[[1.1, 0.0, 2.0], [-1.0, 0.0, 0.0]]);
    for repr in [Repr::Dense, Repr::Sparse] {
        let out = evaluate(&[(repr, &x)], |v| v[0].reshape(&[3, 2]))?;
        assert_eq!(
            out.to_rows(),
            Some(vec![vec![1.1, 0.0], vec![2.0, -1.0], vec![0.0, 0.0]])
        );
    }

    // With unknown dimensions the element count is only known when the plan runs.
    let bad = DenseTensor::matrix(DType::Float64, &[[1.0, 2.0]]);
    assert_eq!(
        kind_of(evaluate(&[(Repr::Dense, &bad)], |v| v[0].reshape(&[3, 2]))),
        ErrorKind::Kernel
    );
    Ok(())
}

#[test]
fn permutations_must_be_bijections() -> Result<()> {
    let g = new_graph();
    let x = dmatrix(&g, "x")?;
    assert_eq!(kind_of(x.dimshuffle(&[0, 0])), ErrorKind::Shape);
    assert_eq!(kind_of(x.dimshuffle(&[0, 1, 2])), ErrorKind::Shape);
    assert_eq!(kind_of(x.dimshuffle(&[])), ErrorKind::Shape);
    Ok(())
}

#[test]
fn repeat_multiplies_the_axis() -> Result<()> {
    let g = new_graph();
    let x = Var::placeholder(&g, "x", DType::Float64, [2, 3], Repr::Sparse)?;
    assert_eq!(x.repeat(2, Some(0))?.shape(), Shape::fixed(&[4, 3]));
    assert_eq!(x.repeat(2, Some(-1))?.shape(), Shape::fixed(&[2, 6]));
    assert_eq!(x.repeat(2, None)?.shape(), Shape::fixed(&[12]));
    assert_eq!(x.repeat(2, Some(1))?.repr(), Repr::Sparse);
    assert_eq!(x.repeat(2, None)?.repr(), Repr::Dense);
    assert_eq!(kind_of(x.repeat(2, Some(2))), ErrorKind::Shape);
    Ok(())
}

#[test]
fn indexing_checks_fixed_bounds() -> Result<()> {
    let g = new_graph();
    let x = Var::placeholder(&g, "x", DType::Float64, [2, 3], Repr::Dense)?;
    assert_eq!(x.index(&[1.into()])?.shape(), Shape::fixed(&[3]));
    assert_eq!(x.index(&[(..).into(), (1..).into()])?.shape(), Shape::fixed(&[2, 2]));
    assert_eq!(kind_of(x.index(&[2.into()])), ErrorKind::Shape);
    assert_eq!(kind_of(x.index(&[0.into(), 0.into(), 0.into()])), ErrorKind::Shape);
    assert_eq!(kind_of(x.index(&[slice(None, None, 0)])), ErrorKind::Shape);
    Ok(())
}

#[test]
fn squeeze_and_diagonal() -> Result<()> {
    let g = new_graph();
    let x = Var::placeholder(&g, "x", DType::Float64, [1, 3], Repr::Dense)?;
    assert_eq!(x.squeeze(None)?.shape(), Shape::fixed(&[3]));
    assert_eq!(x.squeeze(Some(0))?.shape(), Shape::fixed(&[3]));
    assert_eq!(kind_of(x.squeeze(Some(1))), ErrorKind::Shape);
    assert_eq!(x.diagonal()?.shape(), Shape::fixed(&[1]));
    let v = dvector(&g, "v")?;
    assert_eq!(kind_of(v.diagonal()), ErrorKind::Shape);
    assert_eq!(kind_of(v.trace()), ErrorKind::Shape);
    Ok(())
}

#[test]
fn element_counts_that_overflow_are_shape_errors() -> Result<()> {
    let g = new_graph();
    let huge = Var::placeholder(&g, "huge", DType::Float64, [usize::MAX / 2 + 1, 4], Repr::Dense)?;
    assert_eq!(kind_of(huge.flatten()), ErrorKind::Shape);
    assert_eq!(kind_of(huge.reshape(&[-1])), ErrorKind::Shape);
    assert_eq!(kind_of(huge.repeat(2, None)), ErrorKind::Shape);

    for repr in [Repr::Dense, Repr::Sparse] {
        let x = Var::placeholder(&g, &format!("x{repr:?}"), DType::Float64, [2, 3], repr)?;
        assert_eq!(kind_of(x.repeat(usize::MAX, Some(0))), ErrorKind::Shape);
        assert_eq!(kind_of(x.repeat(usize::MAX / 4, Some(1))), ErrorKind::Shape);
    }

    // Left unknown, the same repeat fails when the plan runs instead of panicking.
    let x = DenseTensor::matrix(DType::Float64, &[[1.0, 0.0, 2.0], [0.0, 3.0, 0.0]]);
    for repr in [Repr::Dense, Repr::Sparse] {
        let r = evaluate(&[(repr, &x)], |v| v[0].repeat(usize::MAX, Some(0)));
        assert_eq!(kind_of(r), ErrorKind::Kernel);
    }
    Ok(())
}
