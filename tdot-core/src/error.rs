use crate::loops::LoopClass;
use crate::tensor::{Axis, Operand};

/// Errors that can occur while planning or executing a contraction.
///
/// Every variant is a precondition failure detected before the first write
/// into the output buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("descriptor length mismatch: {sizes} sizes, {strides} strides, {axes} axes")]
    DescriptorLength {
        sizes: usize,
        strides: usize,
        axes: usize,
    },

    #[error("invalid tag {tag} for dimension {dim} of {operand}")]
    InvalidTag { operand: Operand, dim: usize, tag: i8 },

    #[error("axis {axis:?} at dimension {dim} is not valid for {operand}")]
    ForeignAxis {
        operand: Operand,
        dim: usize,
        axis: Axis,
    },

    #[error("batch dimension {dim} of {operand} is not supported")]
    BatchUnsupported { operand: Operand, dim: usize },

    #[error("dimension {dim} of {operand} has zero extent")]
    ZeroExtent { operand: Operand, dim: usize },

    #[error("dimension {dim} of {operand} has negative stride {stride}")]
    NegativeStride {
        operand: Operand,
        dim: usize,
        stride: isize,
    },

    #[error("{operand} has rank {rank}, at least 2 dimensions are required")]
    RankMismatch { operand: Operand, rank: usize },

    #[error("offsets of {operand} do not fit in isize")]
    LayoutOverflow { operand: Operand },

    #[error("innermost dimension of {operand} has stride {stride}, expected 1")]
    NonContiguousInnermost { operand: Operand, stride: isize },

    #[error("output innermost axis is {found:?}, only M-innermost (column-major) output is supported")]
    UnsupportedOutputOrientation { found: Axis },

    #[error("unsupported innermost block {inner:?} for {operand}")]
    UnsupportedLayout { operand: Operand, inner: Vec<Axis> },

    #[error("{class} loops: {left} dimensions in {left_operand} vs {right} in {right_operand}")]
    TagCountMismatch {
        class: LoopClass,
        left_operand: Operand,
        left: usize,
        right_operand: Operand,
        right: usize,
    },

    #[error("{class} loop {position}: extent {left} vs {right}")]
    DimensionMismatch {
        class: LoopClass,
        position: usize,
        left: usize,
        right: usize,
    },

    #[error("{class} loops: {count} dimensions exceed the limit of {max}")]
    TooManyLoops {
        class: LoopClass,
        count: usize,
        max: usize,
    },

    #[error("output layout maps distinct indices to the same element")]
    OverlappingOutput,

    #[error("buffer of {operand} holds {actual} elements, layout needs {required}")]
    BufferTooSmall {
        operand: Operand,
        required: usize,
        actual: usize,
    },

    #[error(transparent)]
    Gemm(#[from] tdot_gemm::GemmError),
}

/// Convenience alias for `Result<T, ContractError>`.
pub type Result<T> = std::result::Result<T, ContractError>;
