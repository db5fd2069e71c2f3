//! Single-block f32 GEMM microkernels.
//!
//! A [`GemmBackend`] turns a [`GemmShape`] (extents, leading dimensions and
//! transpose flags, BLAS column-major convention) into a [`GemmKernel`] that
//! computes one block product `C (+)= op(A) * op(B)` for pointers supplied at
//! call time. The kernel is built once and invoked many times with different
//! base addresses, which is how `tdot-core` drives a whole tensor contraction.
//!
//! # Example
//!
//! ```
//! use tdot_gemm::{Accum, GemmBackend, GemmKernel, GemmShape, NaiveBackend, Transpose};
//!
//! // C(2x2) = A(2x3) * B(3x2), everything column-major.
//! let shape = GemmShape::new(2, 2, 3, 2, 3, 2, Transpose::No, Transpose::No);
//! let kernel = NaiveBackend.dispatch(&shape).unwrap();
//!
//! let a = [1.0f32, 4.0, 2.0, 5.0, 3.0, 6.0];
//! let b = [1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0];
//! let mut c = [0.0f32; 4];
//! unsafe { kernel.execute(a.as_ptr(), b.as_ptr(), c.as_mut_ptr(), Accum::Replace) };
//! assert_eq!(c, [1.0, 4.0, 2.0, 5.0]);
//! ```

/// Backend marker structs and the feature-selected [`ActiveBackend`].
pub mod backend;
#[cfg(feature = "faer")]
/// Microkernel backed by faer's matmul.
pub mod faer_kernel;
/// Microkernel using explicit loops.
pub mod naive;

pub use backend::ActiveBackend;
#[cfg(feature = "faer")]
pub use backend::FaerBackend;
pub use backend::NaiveBackend;
#[cfg(feature = "faer")]
pub use faer_kernel::FaerKernel;
pub use naive::NaiveKernel;

use std::fmt;

/// Orientation of an input matrix relative to the column-major GEMM view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transpose {
    /// Stored column-major: element `(i, j)` at `i + j * ld`.
    No,
    /// Stored row-major: element `(i, j)` at `i * ld + j`.
    Yes,
}

impl Transpose {
    /// BLAS character for this flag (`'N'` or `'T'`).
    pub fn as_char(self) -> char {
        match self {
            Transpose::No => 'N',
            Transpose::Yes => 'T',
        }
    }
}

/// Whether a kernel call overwrites or accumulates into C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accum {
    /// `C = op(A) * op(B)`
    Replace,
    /// `C += op(A) * op(B)`
    Add,
}

/// Errors reported when dispatching a kernel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GemmError {
    #[error("zero extent in GEMM shape: m={m}, n={n}, k={k}")]
    ZeroExtent { m: usize, n: usize, k: usize },
    #[error("leading dimension {operand}: {ld} is smaller than the contiguous extent {extent}")]
    LeadingDimension {
        operand: char,
        ld: usize,
        extent: usize,
    },
}

/// Convenience alias for `Result<T, GemmError>`.
pub type Result<T> = std::result::Result<T, GemmError>;

/// Shape and layout of one block matrix product.
///
/// `op(A)` is `m x k`, `op(B)` is `k x n`, C is `m x n` column-major with
/// leading dimension `ldc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GemmShape {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub lda: usize,
    pub ldb: usize,
    pub ldc: usize,
    pub trans_a: Transpose,
    pub trans_b: Transpose,
}

impl GemmShape {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        m: usize,
        n: usize,
        k: usize,
        lda: usize,
        ldb: usize,
        ldc: usize,
        trans_a: Transpose,
        trans_b: Transpose,
    ) -> Self {
        Self {
            m,
            n,
            k,
            lda,
            ldb,
            ldc,
            trans_a,
            trans_b,
        }
    }

    /// `(row_stride, col_stride)` of `op(A)` viewed as an `m x k` matrix.
    pub fn a_strides(&self) -> (isize, isize) {
        match self.trans_a {
            Transpose::No => (1, self.lda as isize),
            Transpose::Yes => (self.lda as isize, 1),
        }
    }

    /// `(row_stride, col_stride)` of `op(B)` viewed as a `k x n` matrix.
    pub fn b_strides(&self) -> (isize, isize) {
        match self.trans_b {
            Transpose::No => (1, self.ldb as isize),
            Transpose::Yes => (self.ldb as isize, 1),
        }
    }

    /// `(row_stride, col_stride)` of C viewed as an `m x n` matrix.
    pub fn c_strides(&self) -> (isize, isize) {
        (1, self.ldc as isize)
    }

    /// Floating point operations of one kernel call.
    pub fn flops(&self) -> u64 {
        2 * self.m as u64 * self.n as u64 * self.k as u64
    }

    /// Check extents and leading dimensions.
    ///
    /// A leading dimension only has to cover the contiguous extent when the
    /// other extent of that matrix is larger than one.
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 || self.n == 0 || self.k == 0 {
            return Err(GemmError::ZeroExtent {
                m: self.m,
                n: self.n,
                k: self.k,
            });
        }
        let (a_rows, a_cols) = match self.trans_a {
            Transpose::No => (self.m, self.k),
            Transpose::Yes => (self.k, self.m),
        };
        let (b_rows, b_cols) = match self.trans_b {
            Transpose::No => (self.k, self.n),
            Transpose::Yes => (self.n, self.k),
        };
        check_ld('A', self.lda, a_rows, a_cols)?;
        check_ld('B', self.ldb, b_rows, b_cols)?;
        check_ld('C', self.ldc, self.m, self.n)?;
        Ok(())
    }
}

fn check_ld(operand: char, ld: usize, stored_rows: usize, stored_cols: usize) -> Result<()> {
    if stored_cols > 1 && ld < stored_rows {
        return Err(GemmError::LeadingDimension {
            operand,
            ld,
            extent: stored_rows,
        });
    }
    Ok(())
}

impl fmt::Display for GemmShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m={} n={} k={} lda={} ldb={} ldc={} op={}{}",
            self.m,
            self.n,
            self.k,
            self.lda,
            self.ldb,
            self.ldc,
            self.trans_a.as_char(),
            self.trans_b.as_char()
        )
    }
}

/// A block multiply specialised for one [`GemmShape`].
pub trait GemmKernel: Send + Sync {
    /// Shape this kernel was dispatched for.
    fn shape(&self) -> &GemmShape;

    /// Compute `C = op(A) * op(B)` or `C += op(A) * op(B)`.
    ///
    /// # Safety
    ///
    /// Every element addressed through the shape's extents and leading
    /// dimensions must be readable from `a` and `b` and writable through `c`,
    /// and the C block must not overlap A or B or be written concurrently.
    unsafe fn execute(&self, a: *const f32, b: *const f32, c: *mut f32, accum: Accum);
}

/// Provider of [`GemmKernel`]s.
///
/// Implementations are capability objects: `tdot-core` dispatches exactly one
/// kernel per contraction and holds it for the duration of the call.
pub trait GemmBackend {
    type Kernel: GemmKernel;

    /// Build a kernel for `shape`.
    fn dispatch(&self, shape: &GemmShape) -> Result<Self::Kernel>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides_follow_transpose() {
        let s = GemmShape::new(3, 4, 5, 7, 9, 11, Transpose::No, Transpose::Yes);
        assert_eq!(s.a_strides(), (1, 7));
        assert_eq!(s.b_strides(), (9, 1));
        assert_eq!(s.c_strides(), (1, 11));
        assert_eq!(s.flops(), 2 * 3 * 4 * 5);
    }

    #[test]
    fn test_validate_leading_dimension() {
        // op(A) = A^T, A stored k x m -> lda >= k
        let s = GemmShape::new(3, 4, 5, 4, 5, 3, Transpose::Yes, Transpose::No);
        assert_eq!(
            s.validate(),
            Err(GemmError::LeadingDimension {
                operand: 'A',
                ld: 4,
                extent: 5
            })
        );
        let ok = GemmShape::new(3, 4, 5, 5, 5, 3, Transpose::Yes, Transpose::No);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_validate_ignores_ld_of_single_column() {
        // n == 1: C has a single column, ldc is never used
        let s = GemmShape::new(3, 1, 2, 3, 2, 0, Transpose::No, Transpose::No);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_extent() {
        let s = GemmShape::new(0, 4, 5, 1, 5, 1, Transpose::No, Transpose::No);
        assert!(matches!(s.validate(), Err(GemmError::ZeroExtent { .. })));
    }

    #[test]
    fn test_display() {
        let s = GemmShape::new(13, 7, 22, 13, 7, 13, Transpose::No, Transpose::Yes);
        assert_eq!(s.to_string(), "m=13 n=7 k=22 lda=13 ldb=7 ldc=13 op=NT");
    }
}
