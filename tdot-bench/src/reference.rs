//! Dense row-major reference tensors.
//!
//! Serves as the independent implementation the contraction engine is
//! checked and timed against: a tensordot that permutes both operands into
//! matrix form and multiplies them with f64 accumulation.

use rand::Rng;
use tdot_core::{row_major_strides, Odometer};

use crate::error::{BenchError, Result};

/// Owned row-major f32 tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    dims: Vec<usize>,
    data: Vec<f32>,
}

impl DenseTensor {
    pub fn from_vec(dims: &[usize], data: Vec<f32>) -> Result<Self> {
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(BenchError::Shape {
                dims: dims.to_vec(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            dims: dims.to_vec(),
            data,
        })
    }

    pub fn zeros(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
            data: vec![0.0; dims.iter().product()],
        }
    }

    /// Uniform values in `[0, 1)`.
    pub fn random<R: Rng>(dims: &[usize], rng: &mut R) -> Self {
        let len = dims.iter().product();
        Self {
            dims: dims.to_vec(),
            data: (0..len).map(|_| rng.gen::<f32>()).collect(),
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn strides(&self) -> Vec<isize> {
        row_major_strides(&self.dims)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at a multi-index.
    pub fn get(&self, index: &[usize]) -> f32 {
        let offset: isize = index
            .iter()
            .zip(self.strides())
            .map(|(&i, s)| i as isize * s)
            .sum();
        self.data[offset as usize]
    }

    /// Materialized permutation: dimension `i` of the result is dimension
    /// `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Result<Self> {
        let mut seen = vec![false; self.dims.len()];
        let valid = perm.len() == self.dims.len()
            && perm
                .iter()
                .all(|&p| p < seen.len() && !std::mem::replace(&mut seen[p], true));
        if !valid {
            return Err(BenchError::Tensordot(format!(
                "{perm:?} is not a permutation of {} dimensions",
                self.dims.len()
            )));
        }

        let src_strides = self.strides();
        let dims: Vec<usize> = perm.iter().map(|&p| self.dims[p]).collect();
        let strides: Vec<isize> = perm.iter().map(|&p| src_strides[p]).collect();

        let mut data = Vec::with_capacity(self.data.len());
        if !self.data.is_empty() {
            let mut odo = Odometer::new(&dims);
            loop {
                data.push(self.data[odo.offset(&strides) as usize]);
                if odo.advance() {
                    break;
                }
            }
        }
        Ok(Self { dims, data })
    }

    /// Contract `axes_a` of `self` with `axes_b` of `other`.
    ///
    /// The result holds the free dimensions of `self` followed by the free
    /// dimensions of `other`, each in original order.
    pub fn tensordot(&self, other: &Self, axes_a: &[usize], axes_b: &[usize]) -> Result<Self> {
        if axes_a.len() != axes_b.len() {
            return Err(BenchError::Tensordot(format!(
                "{} contracted axes vs {}",
                axes_a.len(),
                axes_b.len()
            )));
        }
        for (&a, &b) in axes_a.iter().zip(axes_b) {
            let (da, db) = (self.dims.get(a), other.dims.get(b));
            if da.is_none() || da != db {
                return Err(BenchError::Tensordot(format!(
                    "axis {a} ({da:?}) does not match axis {b} ({db:?})"
                )));
            }
        }

        let free = |rank: usize, axes: &[usize]| -> Vec<usize> {
            (0..rank).filter(|d| !axes.contains(d)).collect()
        };
        let free_a = free(self.dims.len(), axes_a);
        let free_b = free(other.dims.len(), axes_b);

        let perm_a: Vec<usize> = free_a.iter().chain(axes_a).copied().collect();
        let perm_b: Vec<usize> = axes_b.iter().chain(&free_b).copied().collect();
        let a = self.permute(&perm_a)?;
        let b = other.permute(&perm_b)?;

        let m: usize = free_a.iter().map(|&d| self.dims[d]).product();
        let n: usize = free_b.iter().map(|&d| other.dims[d]).product();
        let k: usize = axes_a.iter().map(|&d| self.dims[d]).product();

        let mut acc = vec![0.0f64; m * n];
        for i in 0..m {
            let row = &mut acc[i * n..(i + 1) * n];
            for p in 0..k {
                let aip = a.data[i * k + p] as f64;
                for (c, &bpj) in row.iter_mut().zip(&b.data[p * n..(p + 1) * n]) {
                    *c += aip * bpj as f64;
                }
            }
        }

        let dims: Vec<usize> = free_a
            .iter()
            .map(|&d| self.dims[d])
            .chain(free_b.iter().map(|&d| other.dims[d]))
            .collect();
        Self::from_vec(&dims, acc.into_iter().map(|v| v as f32).collect())
    }

    /// Element-wise `|a - b| <= atol` or within `rtol` relative difference.
    pub fn allclose(&self, other: &Self, rtol: f32, atol: f32) -> bool {
        self.dims == other.dims
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(&a, &b)| approx::relative_eq!(a, b, epsilon = atol, max_relative = rtol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_permute_matrix_transposes() {
        let a = DenseTensor::from_vec(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let t = a.permute(&[1, 0]).unwrap();
        assert_eq!(t.dims(), &[3, 2]);
        assert_eq!(t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(a.permute(&[0, 0]).is_err());
        assert!(a.permute(&[0]).is_err());
    }

    #[test]
    fn test_tensordot_matmul() {
        let a = DenseTensor::from_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = DenseTensor::from_vec(&[2, 2], vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        let c = a.tensordot(&b, &[1], &[0]).unwrap();
        assert_eq!(c.dims(), &[2, 2]);
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);

        // contracting the leading axes computes A^T B
        let c = a.tensordot(&b, &[0], &[0]).unwrap();
        assert_eq!(c.data(), &[26.0, 30.0, 38.0, 44.0]);
    }

    #[test]
    fn test_tensordot_full_contraction_is_scalar() {
        let a = DenseTensor::from_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let c = a.tensordot(&a, &[0, 1], &[0, 1]).unwrap();
        assert!(c.dims().is_empty());
        assert_eq!(c.data(), &[30.0]);
    }

    #[test]
    fn test_tensordot_rejects_mismatch() {
        let a = DenseTensor::zeros(&[2, 3]);
        let b = DenseTensor::zeros(&[2, 3]);
        assert!(a.tensordot(&b, &[1], &[0]).is_err());
        assert!(a.tensordot(&b, &[1], &[]).is_err());
        assert!(a.tensordot(&b, &[5], &[0]).is_err());
    }

    #[test]
    fn test_allclose_tolerances() {
        let a = DenseTensor::from_vec(&[2], vec![1.0, 100.0]).unwrap();
        let b = DenseTensor::from_vec(&[2], vec![1.0, 100.0005]).unwrap();
        assert!(a.allclose(&b, 1e-5, 1e-8));
        assert!(!a.allclose(&b, 1e-7, 1e-8));
        assert!(!a.allclose(&DenseTensor::zeros(&[1, 2]), 1.0, 1.0));
    }

    proptest! {
        #[test]
        fn test_permute_inverse_roundtrip(seed in 0u64..1000, d0 in 1usize..4, d1 in 1usize..4, d2 in 1usize..4) {
            let mut rng = StdRng::seed_from_u64(seed);
            let a = DenseTensor::random(&[d0, d1, d2], &mut rng);
            let p = a.permute(&[2, 0, 1]).unwrap();
            prop_assert_eq!(p.dims(), &[d2, d0, d1]);
            prop_assert_eq!(p.get(&[d2 - 1, 0, d1 - 1]), a.get(&[0, d1 - 1, d2 - 1]));
            let back = p.permute(&[1, 2, 0]).unwrap();
            prop_assert_eq!(back, a);
        }
    }
}
