//! Layout/shape resolver: maps the innermost block of each operand onto one
//! column-major GEMM call.

use tdot_gemm::{GemmShape, Transpose};

use crate::tensor::{Axis, Operand, TensorDesc};
use crate::{ContractError, Result};

/// Resolve the GEMM shape absorbing the two innermost dimensions of every
/// operand.
///
/// U must be column-major in its innermost block (`[.., N, M]`). S must end in
/// one M and one K dimension, T in one N and one K dimension, in either
/// order:
///
/// | S inner | T inner | m     | n     | k     | op(A), op(B) |
/// |---------|---------|-------|-------|-------|--------------|
/// | M       | N       | S[-1] | T[-1] | T[-2] | N, T         |
/// | M       | K       | S[-1] | T[-2] | T[-1] | N, N         |
/// | K       | N       | S[-2] | T[-1] | S[-1] | T, T         |
/// | K       | K       | S[-2] | T[-2] | S[-1] | T, N         |
///
/// Leading dimensions are the strides of the second-innermost dimension of
/// S, T and U. Descriptors are expected to have passed
/// [`TensorDesc::validate`].
pub fn resolve_layout(
    s: &TensorDesc<'_>,
    t: &TensorDesc<'_>,
    u: &TensorDesc<'_>,
) -> Result<GemmShape> {
    for (operand, desc) in [(Operand::S, s), (Operand::T, t), (Operand::U, u)] {
        if desc.rank() < 2 {
            return Err(ContractError::RankMismatch {
                operand,
                rank: desc.rank(),
            });
        }
    }
    for (operand, desc) in [(Operand::S, s), (Operand::T, t), (Operand::U, u)] {
        let stride = desc.strides()[desc.rank() - 1];
        if stride != 1 {
            return Err(ContractError::NonContiguousInnermost { operand, stride });
        }
    }

    let u_inner = u.inner_axes(2);
    if u_inner[1] != Axis::M {
        return Err(ContractError::UnsupportedOutputOrientation { found: u_inner[1] });
    }
    if u_inner[0] != Axis::N {
        return Err(ContractError::UnsupportedLayout {
            operand: Operand::U,
            inner: u_inner.to_vec(),
        });
    }

    let s_m_inner = match s.inner_axes(2) {
        [Axis::K, Axis::M] => true,
        [Axis::M, Axis::K] => false,
        inner => {
            return Err(ContractError::UnsupportedLayout {
                operand: Operand::S,
                inner: inner.to_vec(),
            })
        }
    };
    let t_n_inner = match t.inner_axes(2) {
        [Axis::K, Axis::N] => true,
        [Axis::N, Axis::K] => false,
        inner => {
            return Err(ContractError::UnsupportedLayout {
                operand: Operand::T,
                inner: inner.to_vec(),
            })
        }
    };

    let last = |d: &TensorDesc<'_>| d.sizes()[d.rank() - 1];
    let second = |d: &TensorDesc<'_>| d.sizes()[d.rank() - 2];
    let ld = |d: &TensorDesc<'_>| d.strides()[d.rank() - 2].unsigned_abs();

    let (m, trans_a, k) = if s_m_inner {
        (last(s), Transpose::No, if t_n_inner { second(t) } else { last(t) })
    } else {
        (second(s), Transpose::Yes, last(s))
    };
    let (n, trans_b) = if t_n_inner {
        (last(t), Transpose::Yes)
    } else {
        (second(t), Transpose::No)
    };

    Ok(GemmShape::new(
        m,
        n,
        k,
        ld(s),
        ld(t),
        ld(u),
        trans_a,
        trans_b,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::row_major_strides;
    use crate::tensor::Axis::{K, M, N};

    fn shape_of(
        s: &[usize],
        s_axes: &[Axis],
        t: &[usize],
        t_axes: &[Axis],
        u: &[usize],
        u_axes: &[Axis],
    ) -> Result<GemmShape> {
        let (ss, ts, us) = (row_major_strides(s), row_major_strides(t), row_major_strides(u));
        let s = TensorDesc::new(s, &ss, s_axes)?;
        let t = TensorDesc::new(t, &ts, t_axes)?;
        let u = TensorDesc::new(u, &us, u_axes)?;
        resolve_layout(&s, &t, &u)
    }

    #[test]
    fn test_scenario_is_nt() {
        let shape = shape_of(
            &[17, 5, 22, 13],
            &[K, M, K, M],
            &[17, 8, 22, 7],
            &[K, N, K, N],
            &[8, 5, 7, 13],
            &[N, M, N, M],
        )
        .unwrap();
        assert_eq!(
            shape,
            GemmShape::new(13, 7, 22, 13, 7, 13, Transpose::No, Transpose::Yes)
        );
    }

    #[test]
    fn test_four_combinations() {
        let nt = shape_of(&[4, 2], &[K, M], &[4, 3], &[K, N], &[3, 2], &[N, M]).unwrap();
        assert_eq!(
            nt,
            GemmShape::new(2, 3, 4, 2, 3, 2, Transpose::No, Transpose::Yes)
        );

        let nn = shape_of(&[4, 2], &[K, M], &[3, 4], &[N, K], &[3, 2], &[N, M]).unwrap();
        assert_eq!(
            nn,
            GemmShape::new(2, 3, 4, 2, 4, 2, Transpose::No, Transpose::No)
        );

        let tt = shape_of(&[2, 4], &[M, K], &[4, 3], &[K, N], &[3, 2], &[N, M]).unwrap();
        assert_eq!(
            tt,
            GemmShape::new(2, 3, 4, 4, 3, 2, Transpose::Yes, Transpose::Yes)
        );

        let tn = shape_of(&[2, 4], &[M, K], &[3, 4], &[N, K], &[3, 2], &[N, M]).unwrap();
        assert_eq!(
            tn,
            GemmShape::new(2, 3, 4, 4, 4, 2, Transpose::Yes, Transpose::No)
        );
    }

    #[test]
    fn test_padded_leading_dimensions() {
        let (s_axes, t_axes, u_axes) = ([K, M], [K, N], [N, M]);
        let s = TensorDesc::new(&[4, 2], &[5, 1], &s_axes).unwrap();
        let t = TensorDesc::new(&[4, 3], &[8, 1], &t_axes).unwrap();
        let u = TensorDesc::new(&[3, 2], &[6, 1], &u_axes).unwrap();
        let shape = resolve_layout(&s, &t, &u).unwrap();
        assert_eq!((shape.lda, shape.ldb, shape.ldc), (5, 8, 6));
    }

    #[test]
    fn test_row_major_output_rejected() {
        let err = shape_of(&[4, 2], &[K, M], &[4, 3], &[K, N], &[2, 3], &[M, N]);
        assert_eq!(
            err,
            Err(ContractError::UnsupportedOutputOrientation { found: N })
        );
    }

    #[test]
    fn test_output_inner_block_needs_n() {
        let err = shape_of(
            &[4, 2, 2],
            &[K, M, M],
            &[4, 3],
            &[K, N],
            &[3, 2, 2],
            &[N, M, M],
        );
        assert_eq!(
            err,
            Err(ContractError::UnsupportedLayout {
                operand: Operand::U,
                inner: vec![M, M],
            })
        );
    }

    #[test]
    fn test_unsupported_input_blocks() {
        let err = shape_of(
            &[4, 2, 2],
            &[K, M, M],
            &[4, 3],
            &[K, N],
            &[3, 2, 2],
            &[N, N, M],
        );
        assert_eq!(
            err,
            Err(ContractError::UnsupportedLayout {
                operand: Operand::S,
                inner: vec![M, M],
            })
        );

        let err = shape_of(
            &[4, 2],
            &[K, M],
            &[4, 3, 3],
            &[K, N, N],
            &[3, 3, 2],
            &[N, N, M],
        );
        assert_eq!(
            err,
            Err(ContractError::UnsupportedLayout {
                operand: Operand::T,
                inner: vec![N, N],
            })
        );
    }

    #[test]
    fn test_non_contiguous_innermost() {
        let (s_axes, t_axes, u_axes) = ([K, M], [K, N], [N, M]);
        let s = TensorDesc::new(&[4, 2], &[4, 2], &s_axes).unwrap();
        let t = TensorDesc::new(&[4, 3], &[3, 1], &t_axes).unwrap();
        let u = TensorDesc::new(&[3, 2], &[2, 1], &u_axes).unwrap();
        assert_eq!(
            resolve_layout(&s, &t, &u),
            Err(ContractError::NonContiguousInnermost {
                operand: Operand::S,
                stride: 2,
            })
        );
    }

    #[test]
    fn test_rank_one_rejected() {
        let err = shape_of(&[4], &[K], &[4, 3], &[K, N], &[3, 2], &[N, M]);
        assert_eq!(
            err,
            Err(ContractError::RankMismatch {
                operand: Operand::S,
                rank: 1,
            })
        );
    }
}
