//! Scalar routines shared by the dense and sparse kernels.
//!
//! Binary routines take the promoted operand type so integer and float conventions can differ.
use crate::dtype::DType;
use crate::error::KernelError;

pub type UnaryFn = fn(f64) -> f64;
pub type BinaryFn = fn(f64, f64, DType) -> Result<f64, KernelError>;

pub fn sign(x: f64) -> f64 {
    if x == 0.0 || x.is_nan() {
        x
    } else {
        x.signum()
    }
}

pub fn neg(x: f64) -> f64 {
    -x
}

pub fn identity(x: f64) -> f64 {
    x
}

pub fn zero(_: f64) -> f64 {
    0.0
}

pub fn one(_: f64) -> f64 {
    1.0
}

////////////////////////////////////////////////////////////////////////////////
// Arithmetic

pub fn add(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    Ok(a + b)
}

pub fn sub(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    Ok(a - b)
}

pub fn mul(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    Ok(a * b)
}

pub fn truediv(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    Ok(a / b)
}

/// Division rounding towards negative infinity.
pub fn floordiv(a: f64, b: f64, t: DType) -> Result<f64, KernelError> {
    if t.is_integral() && b == 0.0 {
        return Err(KernelError::DivisionByZero);
    }
    if b == 0.0 {
        return Ok(a / b);
    }
    let r = modulo(a, b, t)?;
    Ok(((a - r) / b).round())
}

/// Remainder taking the sign of the divisor.
pub fn modulo(a: f64, b: f64, t: DType) -> Result<f64, KernelError> {
    if t.is_integral() && b == 0.0 {
        return Err(KernelError::DivisionByZero);
    }
    if b == 0.0 {
        return Ok(f64::NAN);
    }
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

pub fn pow(a: f64, b: f64, t: DType) -> Result<f64, KernelError> {
    if t.is_integral() && b < 0.0 {
        return Err(KernelError::NegativeIntegerPower);
    }
    Ok(a.powf(b))
}

////////////////////////////////////////////////////////////////////////////////
// Comparisons

fn truth(b: bool) -> Result<f64, KernelError> {
    Ok(if b { 1.0 } else { 0.0 })
}

pub fn lt(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    truth(a < b)
}

pub fn le(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    truth(a <= b)
}

pub fn gt(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    truth(a > b)
}

pub fn ge(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    truth(a >= b)
}

pub fn eq(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    truth(a == b)
}

pub fn neq(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    truth(a != b)
}

////////////////////////////////////////////////////////////////////////////////
// Bitwise, on integral operands only

fn bits(a: f64) -> i64 {
    a as i64
}

pub fn and(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    Ok((bits(a) & bits(b)) as f64)
}

pub fn or(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    Ok((bits(a) | bits(b)) as f64)
}

pub fn xor(a: f64, b: f64, _: DType) -> Result<f64, KernelError> {
    Ok((bits(a) ^ bits(b)) as f64)
}
