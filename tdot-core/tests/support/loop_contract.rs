//! Direct loop reference for `U = contract(S, T)`.
//!
//! Enumerates every U index and every K assignment explicitly and sums in
//! f64. Independent of the loop sets and the GEMM kernels under test.

use rand::{rngs::StdRng, Rng, SeedableRng};
use tdot_core::{row_major_strides, Axis, TensorDesc};

/// Owned sizes/strides/axes plus data for one operand.
#[derive(Clone, Debug)]
pub struct LoopTensor {
    pub sizes: Vec<usize>,
    pub strides: Vec<isize>,
    pub axes: Vec<Axis>,
    pub data: Vec<f32>,
}

impl LoopTensor {
    pub fn dense(sizes: &[usize], axes: &[Axis], data: Vec<f32>) -> Self {
        Self::strided(sizes, &row_major_strides(sizes), axes, data)
    }

    pub fn strided(sizes: &[usize], strides: &[isize], axes: &[Axis], data: Vec<f32>) -> Self {
        assert_eq!(sizes.len(), strides.len());
        assert_eq!(sizes.len(), axes.len());
        Self {
            sizes: sizes.to_vec(),
            strides: strides.to_vec(),
            axes: axes.to_vec(),
            data,
        }
    }

    /// Dense operand filled with uniform values in `[0, 1)`.
    pub fn random(sizes: &[usize], axes: &[Axis], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let len = sizes.iter().product();
        let data = (0..len).map(|_| rng.gen::<f32>()).collect();
        Self::dense(sizes, axes, data)
    }

    /// Dense operand filled with `value`.
    pub fn filled(sizes: &[usize], axes: &[Axis], value: f32) -> Self {
        let len = sizes.iter().product();
        Self::dense(sizes, axes, vec![value; len])
    }

    pub fn desc(&self) -> TensorDesc<'_> {
        TensorDesc::new(&self.sizes, &self.strides, &self.axes).unwrap()
    }

    /// Descriptor together with the mutable data, for use as the output.
    pub fn desc_mut(&mut self) -> (TensorDesc<'_>, &mut [f32]) {
        let desc = TensorDesc::new(&self.sizes, &self.strides, &self.axes).unwrap();
        (desc, &mut self.data)
    }

    pub fn offset(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(&self.strides)
            .map(|(&i, &s)| i as isize * s)
            .sum::<isize>() as usize
    }

    /// Every multi-index of the operand, row-major order.
    pub fn indices(&self) -> Vec<Vec<usize>> {
        all_indices(&self.sizes)
    }
}

fn all_indices(sizes: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for &size in sizes {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..size).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    out
}

fn positions(axes: &[Axis], filter: Axis) -> Vec<usize> {
    axes.iter()
        .enumerate()
        .filter(|(_, &a)| a == filter)
        .map(|(i, _)| i)
        .collect()
}

/// Reference value of every U element, keyed by U's multi-index in row-major
/// order (the order of [`LoopTensor::indices`]).
pub fn loop_contract(s: &LoopTensor, t: &LoopTensor, u: &LoopTensor) -> Vec<f64> {
    let (s_m, s_k) = (positions(&s.axes, Axis::M), positions(&s.axes, Axis::K));
    let (t_n, t_k) = (positions(&t.axes, Axis::N), positions(&t.axes, Axis::K));
    let (u_m, u_n) = (positions(&u.axes, Axis::M), positions(&u.axes, Axis::N));
    assert_eq!(s_m.len(), u_m.len());
    assert_eq!(t_n.len(), u_n.len());
    assert_eq!(s_k.len(), t_k.len());

    let k_sizes: Vec<usize> = s_k.iter().map(|&p| s.sizes[p]).collect();
    let k_indices = all_indices(&k_sizes);

    let mut s_idx = vec![0; s.sizes.len()];
    let mut t_idx = vec![0; t.sizes.len()];
    u.indices()
        .into_iter()
        .map(|u_idx| {
            for (&sp, &up) in s_m.iter().zip(&u_m) {
                s_idx[sp] = u_idx[up];
            }
            for (&tp, &up) in t_n.iter().zip(&u_n) {
                t_idx[tp] = u_idx[up];
            }
            let mut acc = 0.0f64;
            for k_idx in &k_indices {
                for (j, &k) in k_idx.iter().enumerate() {
                    s_idx[s_k[j]] = k;
                    t_idx[t_k[j]] = k;
                }
                acc += s.data[s.offset(&s_idx)] as f64 * t.data[t.offset(&t_idx)] as f64;
            }
            acc
        })
        .collect()
}
