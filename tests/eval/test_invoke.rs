use crate::harness::{dense, kind_of, sparse};

use symgraph::prelude::*;
use symgraph::{Error, ErrorKind, KernelError, Result, ValueError};

fn positional_error(r: Result<Vec<Value>>) -> usize {
    match r {
        Err(Error::InvalidInput { position, .. }) => position,
        other => panic!("expected an invalid input error, got {other:?}"),
    }
}

#[test]
fn inputs_are_validated_before_any_kernel_runs() -> Result<()> {
    let g = new_graph();
    let x = Var::placeholder(&g, "x", DType::Float64, [2, 2], Repr::Dense)?;
    let y = Var::placeholder(&g, "y", DType::Int64, Shape::unknown(2), Repr::Sparse)?;
    let z = (&x * &y)?;
    let f = function(&[&x, &y], &[&z], CompileOptions::default())?;

    let xv = DenseTensor::matrix(DType::Float64, &[[1.0, 2.0], [3.0, 4.0]]);
    let yv = DenseTensor::matrix(DType::Int64, &[[0, 1], [2, 0]]);
    let out = f.invoke(&[dense(&xv), sparse(&yv)])?;
    assert_eq!(out[0].repr(), Repr::Sparse);
    assert_eq!(out[0].to_dense().data(), &[0.0, 2.0, 6.0, 0.0]);

    assert_eq!(kind_of(f.invoke(&[dense(&xv)])), ErrorKind::InvalidInput);
    assert_eq!(kind_of(f.invoke(&[])), ErrorKind::InvalidInput);

    // Representation must match exactly.
    assert_eq!(positional_error(f.invoke(&[dense(&xv), dense(&yv)])), 1);
    assert_eq!(positional_error(f.invoke(&[sparse(&xv), sparse(&yv)])), 0);

    // Fixed dimensions must match; unknown ones admit any extent, but not any rank.
    let wide = DenseTensor::matrix(DType::Float64, &[[1.0, 2.0, 3.0]]);
    assert_eq!(positional_error(f.invoke(&[dense(&wide), sparse(&yv)])), 0);
    let v = DenseTensor::from_vec(DType::Float64, vec![4], vec![1, 2, 3, 4]).unwrap();
    assert_eq!(positional_error(f.invoke(&[dense(&v), sparse(&yv)])), 0);

    // Float64 does not narrow to Int64.
    let yf = DenseTensor::matrix(DType::Float64, &[[0.0, 1.0], [2.0, 0.0]]);
    assert_eq!(positional_error(f.invoke(&[dense(&xv), sparse(&yf)])), 1);
    Ok(())
}

#[test]
fn safe_casts_are_applied_on_entry() -> Result<()> {
    let g = new_graph();
    let x = Var::placeholder(&g, "x", DType::Int64, Shape::unknown(1), Repr::Dense)?;
    let z = x.sum(None)?;
    let f = function(&[&x], &[&x, &z], CompileOptions::default())?;

    let small = DenseTensor::from_vec(DType::Int8, vec![3], vec![1, 2, 3]).unwrap();
    let out = f.invoke(&[dense(&small)])?;
    assert_eq!(out[0].dtype(), DType::Int64);
    assert_eq!(out[1].dtype(), DType::Int64);
    assert_eq!(out[1].to_dense().data(), &[6.0]);

    let flags = DenseTensor::from_vec(DType::Bool, vec![2], vec![1, 0]).unwrap();
    assert_eq!(f.invoke(&[dense(&flags)])?[1].to_dense().data(), &[1.0]);

    let wide = DenseTensor::from_vec(DType::UInt64, vec![1], vec![1u64]).unwrap();
    assert_eq!(kind_of(f.invoke(&[dense(&wide)])), ErrorKind::InvalidInput);
    Ok(())
}

#[test]
fn kernel_failures_name_the_node() -> Result<()> {
    let g = new_graph();
    let x = lvector(&g, "x")?;
    let y = lvector(&g, "y")?;
    let p = x.pow(&y)?;
    let m = x.min(None)?;
    let f = function(&[&x, &y], &[&p, &m], CompileOptions::default())?;

    let xv = DenseTensor::from_vec(DType::Int64, vec![2], vec![2, 3]).unwrap();
    let ok = DenseTensor::from_vec(DType::Int64, vec![2], vec![3, 0]).unwrap();
    let out = f.invoke(&[dense(&xv), dense(&ok)])?;
    assert_eq!(out[0].to_dense().data(), &[8.0, 1.0]);
    assert_eq!(out[1].to_dense().data(), &[2.0]);

    let negative = DenseTensor::from_vec(DType::Int64, vec![2], vec![1, -1]).unwrap();
    match f.invoke(&[dense(&xv), dense(&negative)]) {
        Err(Error::Kernel { op, node, source }) => {
            assert_eq!(op, "pow");
            assert_eq!(node, p.id());
            assert_eq!(source, KernelError::NegativeIntegerPower);
        }
        other => panic!("expected a kernel error, got {other:?}"),
    }

    let empty = DenseTensor::from_vec(DType::Int64, vec![0], Vec::<i64>::new()).unwrap();
    match f.invoke(&[dense(&empty), dense(&empty)]) {
        Err(Error::Kernel { op, node, source }) => {
            assert_eq!(op, "min");
            assert_eq!(node, m.id());
            assert_eq!(source, KernelError::EmptyReduction);
        }
        other => panic!("expected a kernel error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn wide_integers_stay_exact() -> Result<()> {
    const EXACT: i64 = 1 << 53;

    // Past 2^53 an f64 element cannot hold every 64-bit integer, so such values are refused.
    assert!(matches!(
        DenseTensor::from_vec(DType::Int64, vec![1], vec![EXACT + 1]),
        Err(ValueError::Inexact { dtype: DType::Int64, .. })
    ));
    assert!(DenseTensor::from_vec(DType::UInt64, vec![1], vec![u64::MAX]).is_err());
    assert!(DenseTensor::from_vec(DType::Int64, vec![2], vec![EXACT - 1, 1 - EXACT]).is_ok());

    let g = new_graph();
    let x = lvector(&g, "x")?;
    let y = (&x + &x)?;
    let f = function(&[&x], &[&y], CompileOptions::default())?;

    let big = DenseTensor::scalar(DType::Int64, (EXACT + 1) as f64).reshaped(vec![1]);
    assert_eq!(positional_error(f.invoke(&[dense(&big)])), 0);

    let half = DenseTensor::from_vec(DType::Int64, vec![2], vec![1, EXACT / 2]).unwrap();
    match f.invoke(&[dense(&half)]) {
        Err(Error::Kernel { op, node, source }) => {
            assert_eq!(op, "add");
            assert_eq!(node, y.id());
            assert!(matches!(source, KernelError::InexactInteger { dtype: DType::Int64, .. }));
        }
        other => panic!("expected a kernel error, got {other:?}"),
    }
    let small = DenseTensor::from_vec(DType::Int64, vec![2], vec![1, EXACT / 4]).unwrap();
    assert_eq!(f.invoke(&[dense(&small)])?[0].to_dense().data(), &[2.0, (EXACT / 2) as f64]);
    Ok(())
}

#[test]
fn unsigned_results_wrap_like_narrower_types() -> Result<()> {
    for (dtype, wrapped) in [(DType::UInt8, Some(255.0)), (DType::UInt32, Some(4294967295.0)), (DType::UInt64, None)] {
        let g = new_graph();
        let x = Var::placeholder(&g, "x", dtype, [1], Repr::Dense)?;
        let y = Var::placeholder(&g, "y", dtype, [1], Repr::Dense)?;
        let z = (&x - &y)?;
        let f = function(&[&x, &y], &[&z], CompileOptions::default())?;
        let one = DenseTensor::from_vec(dtype, vec![1], vec![1]).unwrap();
        let two = DenseTensor::from_vec(dtype, vec![1], vec![2]).unwrap();
        let r = f.invoke(&[dense(&one), dense(&two)]);
        match wrapped {
            Some(v) => assert_eq!(r?[0].to_dense().data(), &[v]),
            // 2^64 - 1 lies past the exactly-held range.
            None => assert_eq!(kind_of(r), ErrorKind::Kernel),
        }
    }
    Ok(())
}

#[test]
fn one_plan_serves_many_threads() -> Result<()> {
    let g = new_graph();
    let x = dmatrix(&g, "x")?;
    let z = x.transpose()?.dot(&x)?.trace()?;
    let f = function(&[&x], &[&z], CompileOptions::default())?;

    std::thread::scope(|s| {
        let handles: Vec<_> = (1..=8)
            .map(|k| {
                let f = &f;
                s.spawn(move || {
                    let v = DenseTensor::matrix(DType::Float64, &[[k as f64, 0.0], [0.0, 1.0]]);
                    f.invoke(&[dense(&v)]).map(|out| out[0].to_dense().data()[0])
                })
            })
            .collect();
        for (k, h) in (1..=8).zip(handles) {
            let trace = h.join().unwrap().unwrap();
            assert_eq!(trace, (k * k) as f64 + 1.0);
        }
    });
    Ok(())
}

#[test]
fn invocation_leaves_the_plan_unchanged() -> Result<()> {
    let g = new_graph();
    let x = csr_dmatrix(&g, "x")?;
    let z = x.exp()?.sum(Some(0))?;
    let f = function(&[&x], &[&z], CompileOptions::default())?;
    let order: Vec<_> = f.order().collect();

    let v = DenseTensor::matrix(DType::Float64, &[[0.0, 1.0], [0.0, 0.0]]);
    let a = f.invoke(&[sparse(&v)])?;
    let _ = f.invoke(&[sparse(&DenseTensor::matrix(DType::Float64, &[[9.0]]))])?;
    let b = f.invoke(&[sparse(&v)])?;
    assert_eq!(a, b);
    assert_eq!(f.order().collect::<Vec<_>>(), order);
    Ok(())
}
