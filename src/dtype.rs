//! Element types and the promotion rules between them.
use core::fmt;

/// The family an element type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Bool,
    Int,
    UInt,
    Float,
}

/// Element type of a tensor: a family together with a bit-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DType {
    pub fn family(self) -> Family {
        use DType::*;
        match self {
            Bool => Family::Bool,
            Int8 | Int16 | Int32 | Int64 => Family::Int,
            UInt8 | UInt16 | UInt32 | UInt64 => Family::UInt,
            Float32 | Float64 => Family::Float,
        }
    }

    pub fn bits(self) -> u32 {
        use DType::*;
        match self {
            Bool | Int8 | UInt8 => 8,
            Int16 | UInt16 => 16,
            Int32 | UInt32 | Float32 => 32,
            Int64 | UInt64 | Float64 => 64,
        }
    }

    pub fn is_float(self) -> bool {
        self.family() == Family::Float
    }

    /// Bool or any integer type.
    pub fn is_integral(self) -> bool {
        !self.is_float()
    }

    fn int_with_bits(bits: u32) -> DType {
        match bits {
            0..=8 => DType::Int8,
            9..=16 => DType::Int16,
            17..=32 => DType::Int32,
            _ => DType::Int64,
        }
    }

    fn uint_with_bits(bits: u32) -> DType {
        match bits {
            0..=8 => DType::UInt8,
            9..=16 => DType::UInt16,
            17..=32 => DType::UInt32,
            _ => DType::UInt64,
        }
    }

    /// The float type transcendental functions produce for `self`.
    ///
    /// Narrow integers (and bools) fit in a `float32` mantissa; wider ones go to `float64`.
    pub fn float_upcast(self) -> DType {
        match self {
            DType::Float32 => DType::Float32,
            DType::Float64 => DType::Float64,
            t if t.bits() <= 16 => DType::Float32,
            _ => DType::Float64,
        }
    }

    /// Smallest type both `a` and `b` convert into without losing their range.
    pub fn promote(a: DType, b: DType) -> DType {
        use Family::*;
        if a == b {
            return a;
        }
        match (a.family(), b.family()) {
            (Bool, _) => b,
            (_, Bool) => a,
            (Int, Int) => Self::int_with_bits(a.bits().max(b.bits())),
            (UInt, UInt) => Self::uint_with_bits(a.bits().max(b.bits())),
            (Int, UInt) => Self::int_with_bits(a.bits().max(2 * b.bits())),
            (UInt, Int) => Self::int_with_bits(b.bits().max(2 * a.bits())),
            (Float, Float) => DType::Float64,
            (Float, _) => float_with(a, b),
            (_, Float) => float_with(b, a),
        }
    }

    /// Type of `sum`/`prod`/`cumsum`/`cumprod` results.
    pub fn accumulator(self) -> DType {
        match self.family() {
            Family::Bool | Family::Int => DType::Int64,
            Family::UInt => DType::UInt64,
            Family::Float => self,
        }
    }

    /// Can a value of type `self` be fed where `to` is declared without losing information?
    pub fn can_cast_safely(self, to: DType) -> bool {
        use Family::*;
        if self == to {
            return true;
        }
        match (self.family(), to.family()) {
            (Bool, _) => true,
            (Int, Int) | (UInt, UInt) | (Float, Float) => self.bits() <= to.bits(),
            (UInt, Int) => self.bits() < to.bits(),
            // every integer is accepted as float64, as numpy does
            (Int, Float) | (UInt, Float) => self.bits() < to.bits() || to == DType::Float64,
            _ => false,
        }
    }

    /// Round `v` into the value set of `self`: truncate and wrap for integers, narrow for floats.
    ///
    /// Every integer width wraps modulo `2^bits`; non-finite values become `0`.
    pub fn coerce(self, v: f64) -> f64 {
        use DType::*;
        match self {
            Bool => (v != 0.0) as u8 as f64,
            Int8 | Int16 | Int32 | Int64 => wrap(v, self.bits(), true),
            UInt8 | UInt16 | UInt32 | UInt64 => wrap(v, self.bits(), false),
            Float32 => v as f32 as f64,
            Float64 => v,
        }
    }

    /// Does `v` stand for exactly one value of `self`?
    ///
    /// Elements are held as `f64`, so 64-bit integers are exact only below `2^53` in magnitude.
    pub fn holds_exactly(self, v: f64) -> bool {
        match self {
            DType::Int64 | DType::UInt64 => v.abs() < MAX_EXACT_INT,
            _ => true,
        }
    }

    pub fn name(self) -> &'static str {
        use DType::*;
        match self {
            Bool => "bool",
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            UInt8 => "uint8",
            UInt16 => "uint16",
            UInt32 => "uint32",
            UInt64 => "uint64",
            Float32 => "float32",
            Float64 => "float64",
        }
    }
}

/// `2^53`: the first integer magnitude an `f64` can no longer tell apart from its neighbour.
pub const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

// Two's-complement wrap of a truncated `v` into `bits` bits.
fn wrap(v: f64, bits: u32, signed: bool) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    let v = v.trunc();
    let modulus = 2f64.powi(bits as i32);
    let (lo, hi) = if signed {
        (-modulus / 2.0, modulus / 2.0)
    } else {
        (0.0, modulus)
    };
    if v >= lo && v < hi {
        return v;
    }
    let m = v.rem_euclid(modulus);
    if signed && m >= hi {
        m - modulus
    } else {
        m
    }
}

// promote a float type `f` against a non-float `other`
fn float_with(f: DType, other: DType) -> DType {
    if f == DType::Float32 && other.bits() <= 16 {
        DType::Float32
    } else {
        DType::Float64
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
