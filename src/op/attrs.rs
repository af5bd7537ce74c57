use crate::shape::{normalize_axis, ShapeError};
use core::fmt;
use core::ops::{Range, RangeFrom, RangeFull, RangeTo};

/// Static parameters of an operator application, recorded in the node's origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Attrs {
    /// No parameters, or the operator's defaults.
    #[default]
    None,
    /// Axis of a reduction or scan; `None` means "all axes, flattened".
    Axis(Option<isize>),
    /// Reshape target; at most one entry may be `-1`.
    Shape(Vec<isize>),
    /// A permutation of the operand's axes.
    Permutation(Vec<usize>),
    Repeat {
        repeats: usize,
        axis: Option<isize>,
    },
    /// One entry per leading axis; trailing axes are taken whole.
    Index(Vec<IndexSpec>),
}

impl fmt::Display for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Which [`Attrs`] variant an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    None,
    Axis { default: Option<isize> },
    Shape,
    /// `Attrs::None` stands for reversing the axes when `default_reverse` is set.
    Permutation { default_reverse: bool },
    Repeat,
    Index,
}

/// One entry of an indexing expression: a Python-style slice, or a single position which drops
/// its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexSpec {
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
    At(isize),
}

/// A slice resolved against a concrete dimension size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlice {
    pub start: isize,
    pub step: isize,
    pub len: usize,
}

impl ResolvedSlice {
    /// Source position of the `i`th selected element.
    pub fn source(&self, i: usize) -> usize {
        (self.start + self.step * i as isize) as usize
    }
}

impl IndexSpec {
    pub fn full() -> Self {
        IndexSpec::Slice {
            start: None,
            stop: None,
            step: 1,
        }
    }

    pub fn slice(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        IndexSpec::Slice { start, stop, step }
    }

    /// Resolve a slice against an axis of size `n`, following Python's `slice.indices`.
    pub fn resolve_slice(
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
        n: usize,
    ) -> Result<ResolvedSlice, ShapeError> {
        if step == 0 {
            return Err(ShapeError::ZeroStep);
        }
        let n = n as isize;
        let clamp = |v: isize, lo: isize, hi: isize| {
            let v = if v < 0 { v + n } else { v };
            v.clamp(lo, hi)
        };
        let (start, stop) = if step > 0 {
            (
                start.map_or(0, |s| clamp(s, 0, n)),
                stop.map_or(n, |s| clamp(s, 0, n)),
            )
        } else {
            (
                start.map_or(n - 1, |s| clamp(s, -1, n - 1)),
                stop.map_or(-1, |s| clamp(s, -1, n - 1)),
            )
        };
        let span = if step > 0 { stop - start } else { start - stop };
        let len = if span <= 0 {
            0
        } else {
            ((span + step.abs() - 1) / step.abs()) as usize
        };
        Ok(ResolvedSlice { start, step, len })
    }

    /// Resolve a single position against an axis of size `n`.
    pub fn resolve_at(index: isize, axis: usize, n: usize) -> Result<usize, ShapeError> {
        normalize_axis(index, n).map_err(|_| ShapeError::Index {
            index,
            axis,
            size: n,
        })
    }
}

impl From<RangeFull> for IndexSpec {
    fn from(_: RangeFull) -> Self {
        IndexSpec::full()
    }
}

impl From<Range<isize>> for IndexSpec {
    fn from(r: Range<isize>) -> Self {
        IndexSpec::slice(Some(r.start), Some(r.end), 1)
    }
}

impl From<RangeTo<isize>> for IndexSpec {
    fn from(r: RangeTo<isize>) -> Self {
        IndexSpec::slice(None, Some(r.end), 1)
    }
}

impl From<RangeFrom<isize>> for IndexSpec {
    fn from(r: RangeFrom<isize>) -> Self {
        IndexSpec::slice(Some(r.start), None, 1)
    }
}

impl From<isize> for IndexSpec {
    fn from(i: isize) -> Self {
        IndexSpec::At(i)
    }
}
