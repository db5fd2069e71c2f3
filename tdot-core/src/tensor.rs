//! Operand roles, axis tags and borrowed tensor descriptors.

use std::fmt;

use crate::{ContractError, Result};

/// Role of an operand in `U = contract(S, T)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    S,
    T,
    U,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operand::S => "S",
            Operand::T => "T",
            Operand::U => "U",
        };
        f.write_str(name)
    }
}

/// Class of a tensor dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Free dimension of S, kept in U.
    M,
    /// Free dimension of T, kept in U.
    N,
    /// Reduction dimension shared by S and T.
    K,
    /// Dimension shared by all three operands (reserved).
    Batch,
}

impl Axis {
    /// Decode an operand-specific integer tag.
    ///
    /// | tag | S     | T     | U     |
    /// |-----|-------|-------|-------|
    /// | 0   | M     | N     | M     |
    /// | 1   | K     | K     | N     |
    /// | 2   | Batch | Batch | Batch |
    pub fn from_tag(operand: Operand, tag: i8) -> Option<Axis> {
        let axis = match (operand, tag) {
            (Operand::S, 0) | (Operand::U, 0) => Axis::M,
            (Operand::T, 0) | (Operand::U, 1) => Axis::N,
            (Operand::S, 1) | (Operand::T, 1) => Axis::K,
            (_, 2) => Axis::Batch,
            _ => return None,
        };
        Some(axis)
    }

    /// Inverse of [`Axis::from_tag`]; `None` if the axis is foreign to `operand`.
    pub fn tag(self, operand: Operand) -> Option<i8> {
        match (operand, self) {
            (Operand::S, Axis::M) | (Operand::T, Axis::N) | (Operand::U, Axis::M) => Some(0),
            (Operand::S, Axis::K) | (Operand::T, Axis::K) | (Operand::U, Axis::N) => Some(1),
            (_, Axis::Batch) => Some(2),
            _ => None,
        }
    }

    /// Whether this axis may appear in `operand`.
    pub fn belongs_to(self, operand: Operand) -> bool {
        self.tag(operand).is_some()
    }
}

/// Decode a slice of raw tags for `operand`.
pub fn decode_tags(operand: Operand, tags: &[i8]) -> Result<Vec<Axis>> {
    tags.iter()
        .enumerate()
        .map(|(dim, &tag)| {
            Axis::from_tag(operand, tag).ok_or(ContractError::InvalidTag { operand, dim, tag })
        })
        .collect()
}

/// Row-major (C order) strides for `sizes`: the last dimension has stride 1.
pub fn row_major_strides(sizes: &[usize]) -> Vec<isize> {
    let mut strides = vec![1isize; sizes.len()];
    for i in (0..sizes.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * sizes[i + 1] as isize;
    }
    strides
}

/// Dimension sizes, element strides and axis tags of one operand.
///
/// The descriptor borrows the caller's arrays; data buffers are passed
/// separately at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorDesc<'a> {
    sizes: &'a [usize],
    strides: &'a [isize],
    axes: &'a [Axis],
}

impl<'a> TensorDesc<'a> {
    pub fn new(sizes: &'a [usize], strides: &'a [isize], axes: &'a [Axis]) -> Result<Self> {
        if sizes.len() != strides.len() || sizes.len() != axes.len() {
            return Err(ContractError::DescriptorLength {
                sizes: sizes.len(),
                strides: strides.len(),
                axes: axes.len(),
            });
        }
        Ok(Self {
            sizes,
            strides,
            axes,
        })
    }

    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    pub fn sizes(&self) -> &'a [usize] {
        self.sizes
    }

    pub fn strides(&self) -> &'a [isize] {
        self.strides
    }

    pub fn axes(&self) -> &'a [Axis] {
        self.axes
    }

    /// Axes of the `depth` innermost dimensions, outermost first.
    pub fn inner_axes(&self, depth: usize) -> &'a [Axis] {
        &self.axes[self.rank().saturating_sub(depth)..]
    }

    /// Check extents, strides and tags of this descriptor acting as `operand`.
    pub fn validate(&self, operand: Operand) -> Result<()> {
        for (dim, ((&size, &stride), &axis)) in self
            .sizes
            .iter()
            .zip(self.strides)
            .zip(self.axes)
            .enumerate()
        {
            if !axis.belongs_to(operand) {
                return Err(ContractError::ForeignAxis { operand, dim, axis });
            }
            if axis == Axis::Batch {
                return Err(ContractError::BatchUnsupported { operand, dim });
            }
            if size == 0 {
                return Err(ContractError::ZeroExtent { operand, dim });
            }
            if stride < 0 {
                return Err(ContractError::NegativeStride {
                    operand,
                    dim,
                    stride,
                });
            }
        }
        Ok(())
    }

    /// Number of elements a buffer must hold to back this layout.
    ///
    /// `None` when the largest offset does not fit in `isize`. Assumes
    /// non-negative strides (see [`TensorDesc::validate`]).
    pub fn span(&self) -> Option<usize> {
        if self.sizes.iter().any(|&s| s == 0) {
            return Some(0);
        }
        let mut last = 0usize;
        for (&size, &stride) in self.sizes.iter().zip(self.strides) {
            let reach = (size - 1).checked_mul(stride.unsigned_abs())?;
            last = last.checked_add(reach)?;
        }
        if last >= isize::MAX as usize {
            return None;
        }
        Some(last + 1)
    }

    /// Whether distinct multi-indices always address distinct elements.
    ///
    /// Sufficient check: sorted by stride, every stride must exceed the largest
    /// offset reachable through the smaller ones. A layout whose offsets
    /// overflow `usize` is reported as overlapping.
    pub fn is_non_overlapping(&self) -> bool {
        let mut dims: Vec<(usize, usize)> = self
            .sizes
            .iter()
            .zip(self.strides)
            .filter(|(&size, _)| size > 1)
            .map(|(&size, &stride)| (stride.unsigned_abs(), size))
            .collect();
        dims.sort_unstable();

        let mut reach = 0usize;
        for (stride, size) in dims {
            if stride <= reach {
                return false;
            }
            match (size - 1)
                .checked_mul(stride)
                .and_then(|r| reach.checked_add(r))
            {
                Some(r) => reach = r,
                None => return false,
            }
        }
        true
    }
}
