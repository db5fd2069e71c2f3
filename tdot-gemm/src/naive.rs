//! Naive GEMM kernel on raw strided pointers.

use crate::{Accum, GemmKernel, GemmShape};

/// Block multiply using explicit loops over `m`, `n`, `k`.
#[derive(Debug, Clone, Copy)]
pub struct NaiveKernel {
    shape: GemmShape,
}

impl NaiveKernel {
    pub fn new(shape: GemmShape) -> Self {
        Self { shape }
    }
}

impl GemmKernel for NaiveKernel {
    fn shape(&self) -> &GemmShape {
        &self.shape
    }

    unsafe fn execute(&self, a: *const f32, b: *const f32, c: *mut f32, accum: Accum) {
        let GemmShape { m, n, k, .. } = self.shape;
        let (a_rs, a_cs) = self.shape.a_strides();
        let (b_rs, b_cs) = self.shape.b_strides();
        let (c_rs, c_cs) = self.shape.c_strides();

        for j in 0..n {
            let b_col = b.offset(j as isize * b_cs);
            let c_col = c.offset(j as isize * c_cs);
            for i in 0..m {
                let a_row = a.offset(i as isize * a_rs);
                let mut acc = 0.0f32;
                for p in 0..k {
                    acc += *a_row.offset(p as isize * a_cs) * *b_col.offset(p as isize * b_rs);
                }
                let c_elem = c_col.offset(i as isize * c_rs);
                match accum {
                    Accum::Replace => *c_elem = acc,
                    Accum::Add => *c_elem += acc,
                }
            }
        }
    }
}
