use crate::dtype::DType;
use crate::graph::NodeId;
use crate::shape::ShapeError;
use crate::types::Repr;

/// Failures raised by a kernel while a plan is being invoked.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    #[error("integer division by zero")]
    DivisionByZero,

    #[error("integers cannot be raised to negative integer powers")]
    NegativeIntegerPower,

    #[error("reduction over an empty extent has no identity")]
    EmptyReduction,

    #[error("result element {value} is outside the range of {dtype} values held exactly")]
    InexactInteger { dtype: DType, value: f64 },

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("kernel expected a {expected} operand at position {position}")]
    Operand { position: usize, expected: Repr },
}

/// Coarse classification of [`Error`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Shape,
    Type,
    Representation,
    Reachability,
    InvalidInput,
    Kernel,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("operator `{op}` takes {expected} operand(s), got {got}")]
    Arity {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("operator `{op}` does not accept attributes {attrs}")]
    Attributes { op: &'static str, attrs: String },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("shape error in `{op}`: {source}")]
    Shape {
        op: &'static str,
        #[source]
        source: ShapeError,
    },

    #[error("type error in `{op}`: {message}")]
    Type { op: &'static str, message: String },

    #[error("operator `{op}` has no kernel for operand representations {reprs:?}")]
    UnsupportedRepresentation { op: &'static str, reprs: Vec<Repr> },

    #[error("{name} ({node}) is needed to compute the outputs but is not an input")]
    MissingInput { node: NodeId, name: String },

    #[error("{name} ({node}) is an input but no output depends on it")]
    UnusedInput { node: NodeId, name: String },

    #[error("plan takes {expected} input(s), got {got}")]
    InputCount { expected: usize, got: usize },

    #[error("input {position} ({name}): {message}")]
    InvalidInput {
        position: usize,
        name: String,
        message: String,
    },

    #[error("kernel `{op}` failed at {node}: {source}")]
    Kernel {
        op: &'static str,
        node: NodeId,
        #[source]
        source: KernelError,
    },

    #[error("internal consistency error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            UnknownOperator(_) | Arity { .. } | Attributes { .. } | UnknownNode(_) | Config(_) => {
                ErrorKind::Configuration
            }
            Shape { .. } => ErrorKind::Shape,
            Type { .. } => ErrorKind::Type,
            UnsupportedRepresentation { .. } => ErrorKind::Representation,
            MissingInput { .. } | UnusedInput { .. } => ErrorKind::Reachability,
            InputCount { .. } | InvalidInput { .. } => ErrorKind::InvalidInput,
            Kernel { .. } => ErrorKind::Kernel,
            Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
