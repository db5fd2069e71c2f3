//! faer-backed GEMM kernel on raw strided pointers.
//!
//! Uses `faer::linalg::matmul::matmul_with_conj` for SIMD-optimized matrix
//! multiplication. Transposition is expressed through the row/column strides of
//! the matrix views, so no operand is ever copied.

use crate::{Accum, GemmKernel, GemmShape};
use faer::linalg::matmul::matmul_with_conj;
use faer::mat::{MatMut, MatRef};
use faer::{Conj, Par};

/// Block multiply dispatched to faer.
#[derive(Debug, Clone, Copy)]
pub struct FaerKernel {
    shape: GemmShape,
}

impl FaerKernel {
    pub fn new(shape: GemmShape) -> Self {
        Self { shape }
    }
}

impl GemmKernel for FaerKernel {
    fn shape(&self) -> &GemmShape {
        &self.shape
    }

    unsafe fn execute(&self, a: *const f32, b: *const f32, c: *mut f32, accum: Accum) {
        let GemmShape { m, n, k, .. } = self.shape;
        let (a_rs, a_cs) = self.shape.a_strides();
        let (b_rs, b_cs) = self.shape.b_strides();
        let (c_rs, c_cs) = self.shape.c_strides();

        let a_mat: MatRef<'_, f32> = MatRef::from_raw_parts(a, m, k, a_rs, a_cs);
        let b_mat: MatRef<'_, f32> = MatRef::from_raw_parts(b, k, n, b_rs, b_cs);
        let c_mat: MatMut<'_, f32> = MatMut::from_raw_parts_mut(c, m, n, c_rs, c_cs);

        let accum = match accum {
            Accum::Replace => faer::Accum::Replace,
            Accum::Add => faer::Accum::Add,
        };
        matmul_with_conj(c_mat, accum, a_mat, Conj::No, b_mat, Conj::No, 1.0f32, Par::Seq);
    }
}
