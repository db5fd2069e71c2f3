//! Loop-set builder: matched loop descriptors for one dimension class.

use std::fmt;

use crate::filter::filter_attributes;
use crate::tensor::{Axis, Operand, TensorDesc};
use crate::{ContractError, Result};

/// Class of an explicit loop and the operand pair it strides through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopClass {
    /// Free dimensions of S, iterated over S and U.
    M,
    /// Free dimensions of T, iterated over T and U.
    N,
    /// Reduction dimensions, iterated over S and T.
    K,
}

impl LoopClass {
    /// Axis selected in both operands.
    pub fn axis(self) -> Axis {
        match self {
            LoopClass::M => Axis::M,
            LoopClass::N => Axis::N,
            LoopClass::K => Axis::K,
        }
    }

    /// `(a, b)` operands this class strides through.
    pub fn operands(self) -> (Operand, Operand) {
        match self {
            LoopClass::M => (Operand::S, Operand::U),
            LoopClass::N => (Operand::T, Operand::U),
            LoopClass::K => (Operand::S, Operand::T),
        }
    }
}

impl fmt::Display for LoopClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopClass::M => "M",
            LoopClass::N => "N",
            LoopClass::K => "K",
        };
        f.write_str(name)
    }
}

/// Sizes and per-operand strides of every dimension in one class, aligned by
/// position.
///
/// The last entry is the dimension absorbed into the GEMM block; only the
/// first [`LoopSet::outer_len`] entries are iterated explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSet {
    class: LoopClass,
    sizes: Vec<usize>,
    strides_a: Vec<isize>,
    strides_b: Vec<isize>,
}

impl LoopSet {
    /// Classify the dimensions of `a` and `b` for `class`.
    ///
    /// The loop sizes come from `a`; the extents of `b` must agree with them
    /// position by position. Both operands must hold the same number of
    /// dimensions of the class, and no more than `max_loops`.
    pub fn build(
        class: LoopClass,
        a: &TensorDesc<'_>,
        b: &TensorDesc<'_>,
        max_loops: usize,
    ) -> Result<Self> {
        let filter = class.axis();
        let sizes = filter_attributes(filter, a.axes(), a.sizes());
        let strides_a = filter_attributes(filter, a.axes(), a.strides());
        let strides_b = filter_attributes(filter, b.axes(), b.strides());
        debug_assert_eq!(sizes.len(), strides_a.len());

        if strides_b.len() != sizes.len() {
            let (left_operand, right_operand) = class.operands();
            return Err(ContractError::TagCountMismatch {
                class,
                left_operand,
                left: sizes.len(),
                right_operand,
                right: strides_b.len(),
            });
        }
        if sizes.len() > max_loops {
            return Err(ContractError::TooManyLoops {
                class,
                count: sizes.len(),
                max: max_loops,
            });
        }

        let sizes_b = filter_attributes(filter, b.axes(), b.sizes());
        if let Some(position) = sizes.iter().zip(&sizes_b).position(|(x, y)| x != y) {
            return Err(ContractError::DimensionMismatch {
                class,
                position,
                left: sizes[position],
                right: sizes_b[position],
            });
        }

        Ok(Self {
            class,
            sizes,
            strides_a,
            strides_b,
        })
    }

    pub fn class(&self) -> LoopClass {
        self.class
    }

    /// Number of dimensions in the class, including the absorbed one.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Number of explicitly iterated loops.
    pub fn outer_len(&self) -> usize {
        self.sizes.len().saturating_sub(1)
    }

    /// Sizes of the explicitly iterated loops.
    pub fn outer_sizes(&self) -> &[usize] {
        &self.sizes[..self.outer_len()]
    }

    /// Iterations of the explicit loop nest of this class.
    pub fn iterations(&self) -> usize {
        self.outer_sizes().iter().product()
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn strides_a(&self) -> &[isize] {
        &self.strides_a
    }

    pub fn strides_b(&self) -> &[isize] {
        &self.strides_b
    }
}
