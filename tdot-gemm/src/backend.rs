//! Backend marker structs.
//!
//! Each backend is a zero-sized capability object implementing
//! [`GemmBackend`](crate::GemmBackend). [`ActiveBackend`] is the single point
//! of backend selection based on Cargo features.

use crate::{GemmBackend, GemmShape, NaiveKernel, Result};

/// GEMM backend using the [`faer`] library.
#[cfg(feature = "faer")]
#[derive(Debug, Clone, Copy, Default)]
pub struct FaerBackend;

#[cfg(feature = "faer")]
impl GemmBackend for FaerBackend {
    type Kernel = crate::FaerKernel;

    fn dispatch(&self, shape: &GemmShape) -> Result<Self::Kernel> {
        shape.validate()?;
        Ok(crate::FaerKernel::new(*shape))
    }
}

/// Fallback GEMM backend using explicit loops (no external library).
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveBackend;

impl GemmBackend for NaiveBackend {
    type Kernel = NaiveKernel;

    fn dispatch(&self, shape: &GemmShape) -> Result<Self::Kernel> {
        shape.validate()?;
        Ok(NaiveKernel::new(*shape))
    }
}

/// The active GEMM backend, selected by Cargo features.
///
/// - `faer` -> [`FaerBackend`]
/// - no backend feature -> [`NaiveBackend`]
#[cfg(feature = "faer")]
pub type ActiveBackend = FaerBackend;

#[cfg(not(feature = "faer"))]
pub type ActiveBackend = NaiveBackend;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GemmError, GemmKernel, Transpose};

    #[test]
    fn test_dispatch_rejects_invalid_shape() {
        let shape = GemmShape::new(2, 0, 2, 2, 2, 2, Transpose::No, Transpose::No);
        assert!(matches!(
            NaiveBackend.dispatch(&shape),
            Err(GemmError::ZeroExtent { .. })
        ));
        assert!(ActiveBackend::default().dispatch(&shape).is_err());
    }

    #[test]
    fn test_dispatch_keeps_shape() {
        let shape = GemmShape::new(4, 3, 2, 4, 2, 4, Transpose::No, Transpose::No);
        let kernel = ActiveBackend::default().dispatch(&shape).unwrap();
        assert_eq!(kernel.shape(), &shape);
    }
}
