//! Shape descriptors: ordered dimensions which are either fixed or unknown until invocation.
use core::fmt;

/// A single dimension of a [`Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dim {
    Fixed(usize),
    Unknown,
}

impl Dim {
    pub fn fixed(self) -> Option<usize> {
        match self {
            Dim::Fixed(n) => Some(n),
            Dim::Unknown => None,
        }
    }

    /// Does a concrete size `n` satisfy this dimension?
    pub fn admits(self, n: usize) -> bool {
        self.fixed().map_or(true, |m| m == n)
    }

    fn try_map<E>(self, f: impl FnOnce(usize) -> Result<usize, E>) -> Result<Dim, E> {
        match self {
            Dim::Fixed(n) => f(n).map(Dim::Fixed),
            Dim::Unknown => Ok(Dim::Unknown),
        }
    }
}

impl From<usize> for Dim {
    fn from(n: usize) -> Self {
        Dim::Fixed(n)
    }
}

impl From<Option<usize>> for Dim {
    fn from(n: Option<usize>) -> Self {
        n.map_or(Dim::Unknown, Dim::Fixed)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{n}"),
            Dim::Unknown => f.write_str("?"),
        }
    }
}

/// The declared shape of a symbolic tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape(pub Vec<Dim>);

impl Shape {
    pub fn scalar() -> Self {
        Shape(vec![])
    }

    pub fn fixed(dims: &[usize]) -> Self {
        Shape(dims.iter().copied().map(Dim::Fixed).collect())
    }

    /// A shape of rank `ndim` with every dimension unknown.
    pub fn unknown(ndim: usize) -> Self {
        Shape(vec![Dim::Unknown; ndim])
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[Dim] {
        &self.0
    }

    /// Total element count, `None` when some dimension is unknown.
    pub fn numel(&self) -> Result<Option<usize>, ShapeError> {
        let Some(dims) = self.concrete() else {
            return Ok(None);
        };
        checked_product(&dims)
            .map(Some)
            .ok_or_else(|| ShapeError::Overflow(self.clone()))
    }

    /// The concrete dimensions, if every dimension is fixed.
    pub fn concrete(&self) -> Option<Vec<usize>> {
        self.0.iter().map(|d| d.fixed()).collect()
    }

    /// Does a concrete shape satisfy this declared shape?
    pub fn admits(&self, dims: &[usize]) -> bool {
        self.ndim() == dims.len() && self.0.iter().zip(dims).all(|(d, &n)| d.admits(n))
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::fixed(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::fixed(&dims)
    }
}

impl From<Vec<Dim>> for Shape {
    fn from(dims: Vec<Dim>) -> Self {
        Shape(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{d}")?;
        }
        if self.0.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

/// Violations of the shape rules, raised at build time for declared shapes and at invocation
/// time for the dimensions that were left unknown.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("shapes {0} and {1} cannot be broadcast together")]
    Broadcast(Shape, Shape),

    #[error("cannot reshape {from} into {to:?}")]
    Reshape { from: Shape, to: Vec<isize> },

    #[error("at most one dimension of a reshape target may be inferred, got {0:?}")]
    MultipleInferred(Vec<isize>),

    #[error("{perm:?} is not a permutation of the {ndim} axes")]
    Permutation { perm: Vec<usize>, ndim: usize },

    #[error("axis {axis} is out of range for a {ndim}-D tensor")]
    Axis { axis: isize, ndim: usize },

    #[error("expected {expected}, got a {got}-D tensor")]
    Rank { expected: &'static str, got: usize },

    #[error("index {index} is out of range for axis {axis} of size {size}")]
    Index { index: isize, axis: usize, size: usize },

    #[error("too many indices: {given} for a {ndim}-D tensor")]
    TooManyIndices { given: usize, ndim: usize },

    #[error("slice step cannot be zero")]
    ZeroStep,

    #[error("cannot squeeze axis {axis} of size {size}")]
    Squeeze { axis: usize, size: Dim },

    #[error("the element count of {0} overflows")]
    Overflow(Shape),

    #[error("{what}: {lhs} and {rhs} do not match")]
    Mismatch {
        what: &'static str,
        lhs: Shape,
        rhs: Shape,
    },
}

////////////////////////////////////////////////////////////////////////////////
// Inference helpers shared by build-time inference and the kernels

/// Broadcast two declared shapes: trailing dimensions are aligned, size-1 dimensions stretch.
pub fn broadcast(a: &Shape, b: &Shape) -> Result<Shape, ShapeError> {
    let n = a.ndim().max(b.ndim());
    let pad = |s: &Shape, i: usize| {
        let offset = n - s.ndim();
        if i < offset {
            Dim::Fixed(1)
        } else {
            s.0[i - offset]
        }
    };

    let mut dims = Vec::with_capacity(n);
    for i in 0..n {
        let d = match (pad(a, i), pad(b, i)) {
            (Dim::Fixed(1), d) | (d, Dim::Fixed(1)) => d,
            (Dim::Fixed(x), Dim::Fixed(y)) if x == y => Dim::Fixed(x),
            (Dim::Fixed(_), Dim::Fixed(_)) => {
                return Err(ShapeError::Broadcast(a.clone(), b.clone()))
            }
            // An unknown dimension must be 1 or equal the other side at runtime.
            (Dim::Unknown, Dim::Fixed(x)) | (Dim::Fixed(x), Dim::Unknown) => Dim::Fixed(x),
            (Dim::Unknown, Dim::Unknown) => Dim::Unknown,
        };
        dims.push(d);
    }
    Ok(Shape(dims))
}

/// Broadcast two concrete shapes.
pub fn broadcast_concrete(a: &[usize], b: &[usize]) -> Result<Vec<usize>, ShapeError> {
    let shape = broadcast(&Shape::fixed(a), &Shape::fixed(b))?;
    // both inputs are fully fixed, so is the result
    Ok(shape.0.iter().map(|d| d.fixed().unwrap_or(0)).collect())
}

/// Turn a possibly-negative axis into an index into `0..ndim`.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize, ShapeError> {
    let n = ndim as isize;
    let a = if axis < 0 { axis + n } else { axis };
    if a < 0 || a >= n {
        Err(ShapeError::Axis { axis, ndim })
    } else {
        Ok(a as usize)
    }
}

/// Infer the result of reshaping `from` into `target`, where at most one entry of `target` is
/// `-1` and is inferred from the element count.
pub fn reshape(from: &Shape, target: &[isize]) -> Result<Shape, ShapeError> {
    let err = || ShapeError::Reshape {
        from: from.clone(),
        to: target.to_vec(),
    };

    let inferred: Vec<usize> = target
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == -1)
        .map(|(i, _)| i)
        .collect();
    if inferred.len() > 1 {
        return Err(ShapeError::MultipleInferred(target.to_vec()));
    }
    if target.iter().any(|&d| d < -1) {
        return Err(err());
    }

    let fixed: Vec<usize> = target.iter().filter(|&&d| d >= 0).map(|&d| d as usize).collect();
    let known = checked_product(&fixed).ok_or_else(|| ShapeError::Overflow(Shape::fixed(&fixed)))?;
    let mut dims: Vec<Dim> = target
        .iter()
        .map(|&d| if d < 0 { Dim::Unknown } else { Dim::Fixed(d as usize) })
        .collect();

    match (from.numel()?, inferred.first()) {
        (Some(n), Some(&i)) => {
            if known == 0 || n % known != 0 {
                return Err(err());
            }
            dims[i] = Dim::Fixed(n / known);
        }
        (Some(n), None) if n != known => return Err(err()),
        // Unknown element count: checked again by the kernel.
        _ => {}
    }
    Ok(Shape(dims))
}

/// Concrete counterpart of [`reshape`].
pub fn reshape_concrete(from: &[usize], target: &[isize]) -> Result<Vec<usize>, ShapeError> {
    let shape = reshape(&Shape::fixed(from), target)?;
    shape.concrete().ok_or(ShapeError::Reshape {
        from: Shape::fixed(from),
        to: target.to_vec(),
    })
}

/// Check that `perm` is a bijection on `0..ndim`.
pub fn check_permutation(perm: &[usize], ndim: usize) -> Result<(), ShapeError> {
    let mut seen = vec![false; ndim];
    let ok = perm.len() == ndim
        && perm.iter().all(|&p| {
            if p >= ndim || seen[p] {
                false
            } else {
                seen[p] = true;
                true
            }
        });
    if ok {
        Ok(())
    } else {
        Err(ShapeError::Permutation {
            perm: perm.to_vec(),
            ndim,
        })
    }
}

/// Apply a permutation of axes to a shape.
pub fn permute<T: Copy>(dims: &[T], perm: &[usize]) -> Vec<T> {
    perm.iter().map(|&p| dims[p]).collect()
}

/// Multiply the size of `axis` by `repeats`.
pub fn repeat(shape: &Shape, repeats: usize, axis: Option<isize>) -> Result<Shape, ShapeError> {
    let overflow = || ShapeError::Overflow(shape.clone());
    match axis {
        None => {
            let n = shape.numel()?.map_or(Dim::Unknown, Dim::Fixed);
            Ok(Shape(vec![n.try_map(|n| n.checked_mul(repeats).ok_or_else(overflow))?]))
        }
        Some(axis) => {
            let a = normalize_axis(axis, shape.ndim())?;
            let mut dims = shape.0.clone();
            dims[a] = dims[a].try_map(|n| n.checked_mul(repeats).ok_or_else(overflow))?;
            let out = Shape(dims);
            out.numel()?;
            Ok(out)
        }
    }
}

/// Concrete counterpart of [`repeat`].
pub fn repeat_concrete(
    dims: &[usize],
    repeats: usize,
    axis: Option<isize>,
) -> Result<Vec<usize>, ShapeError> {
    let shape = repeat(&Shape::fixed(dims), repeats, axis)?;
    // every input dimension is fixed, so is the result
    Ok(shape.0.iter().map(|d| d.fixed().unwrap_or(0)).collect())
}

/// Product of `dims`, `None` on overflow.
pub fn checked_product(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
}
