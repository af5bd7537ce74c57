use super::var::*;
use crate::error::Result;
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Rem, Sub};

// Each operator builds a node, so the result carries the build-time error.
macro_rules! binop {
    ($trait:ident, $method:ident, $op:literal) => {
        impl $trait<&Var> for &Var {
            type Output = Result<Var>;

            fn $method(self, rhs: &Var) -> Self::Output {
                self.apply($op, &[rhs], crate::op::Attrs::None)
            }
        }

        impl $trait for Var {
            type Output = Result<Var>;

            fn $method(self, rhs: Var) -> Self::Output {
                $trait::$method(&self, &rhs)
            }
        }
    };
}

binop!(Add, add, "add");
binop!(Sub, sub, "sub");
binop!(Mul, mul, "mul");
binop!(Div, div, "truediv");
binop!(Rem, rem, "mod");
binop!(BitAnd, bitand, "and");
binop!(BitOr, bitor, "or");
binop!(BitXor, bitxor, "xor");

impl Neg for &Var {
    type Output = Result<Var>;

    fn neg(self) -> Self::Output {
        Var::neg(self)
    }
}

impl Neg for Var {
    type Output = Result<Var>;

    fn neg(self) -> Self::Output {
        Var::neg(&self)
    }
}
