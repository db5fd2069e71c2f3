//! Mixed-radix loop counter.

/// Advance `counters` against `sizes`, last position fastest.
///
/// Saturated positions are reset to zero and the carry moves to the previous
/// position. Returns `true` when the whole vector wrapped back to all zeros,
/// which is also the case for an empty vector.
pub fn advance_loop(sizes: &[usize], counters: &mut [usize]) -> bool {
    debug_assert_eq!(sizes.len(), counters.len());
    for (ctr, &size) in counters.iter_mut().zip(sizes).rev() {
        if *ctr + 1 < size {
            *ctr += 1;
            return false;
        }
        *ctr = 0;
    }
    true
}

/// Flat element offset `Σ counters[i] * strides[i]`.
///
/// `strides` may be longer than `counters`; trailing strides belong to loops
/// absorbed into the GEMM block and are ignored.
#[inline]
pub fn loop_offset(counters: &[usize], strides: &[isize]) -> isize {
    counters
        .iter()
        .zip(strides)
        .map(|(&i, &s)| i as isize * s)
        .sum()
}

/// Owned counter vector over a fixed set of loop sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Odometer {
    sizes: Vec<usize>,
    counters: Vec<usize>,
}

impl Odometer {
    /// All counters start at zero.
    pub fn new(sizes: &[usize]) -> Self {
        Self {
            sizes: sizes.to_vec(),
            counters: vec![0; sizes.len()],
        }
    }

    /// Odometer positioned at the `index`-th state of the enumeration.
    ///
    /// # Panics
    ///
    /// Every size must be at least 1; a zero size panics.
    pub fn from_linear(sizes: &[usize], mut index: usize) -> Self {
        assert!(
            sizes.iter().all(|&size| size > 0),
            "odometer sizes must be positive: {sizes:?}"
        );
        let mut counters = vec![0; sizes.len()];
        for (ctr, &size) in counters.iter_mut().zip(sizes).rev() {
            *ctr = index % size;
            index /= size;
        }
        Self {
            sizes: sizes.to_vec(),
            counters,
        }
    }

    /// Number of distinct states (1 for an empty odometer).
    pub fn total(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn counters(&self) -> &[usize] {
        &self.counters
    }

    /// See [`advance_loop`].
    pub fn advance(&mut self) -> bool {
        advance_loop(&self.sizes, &mut self.counters)
    }

    /// See [`loop_offset`].
    pub fn offset(&self, strides: &[isize]) -> isize {
        loop_offset(&self.counters, strides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_advance_2x3() {
        let mut odo = Odometer::new(&[2, 3]);
        let mut states = vec![odo.counters().to_vec()];
        while !odo.advance() {
            states.push(odo.counters().to_vec());
        }
        assert_eq!(
            states,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2],
            ]
        );
        assert_eq!(odo.counters(), &[0, 0]);
    }

    #[test]
    fn test_advance_empty_wraps_immediately() {
        let mut odo = Odometer::new(&[]);
        assert_eq!(odo.total(), 1);
        assert!(odo.advance());
        assert_eq!(odo.offset(&[7]), 0);
    }

    #[test]
    fn test_offset_ignores_absorbed_stride() {
        let mut counters = [0usize];
        assert!(!advance_loop(&[17], &mut counters));
        // stride 13 belongs to the loop absorbed into the GEMM
        assert_eq!(loop_offset(&counters, &[1430, 13]), 1430);
    }

    #[test]
    fn test_from_linear() {
        assert_eq!(Odometer::from_linear(&[2, 3], 4).counters(), &[1, 1]);
        assert_eq!(Odometer::from_linear(&[2, 3], 0).counters(), &[0, 0]);
        assert_eq!(Odometer::from_linear(&[], 0).counters(), &[] as &[usize]);
    }

    #[test]
    #[should_panic(expected = "odometer sizes must be positive")]
    fn test_from_linear_rejects_zero_size() {
        Odometer::from_linear(&[2, 0, 3], 1);
    }

    proptest! {
        #[test]
        fn prop_enumerates_every_state_once(sizes in proptest::collection::vec(1usize..5, 0..5)) {
            let mut odo = Odometer::new(&sizes);
            let total = odo.total();
            let mut seen = Vec::with_capacity(total);
            let mut wrapped = false;
            for step in 0..total {
                let expected = Odometer::from_linear(&sizes, step);
                prop_assert_eq!(odo.counters(), expected.counters());
                seen.push(odo.counters().to_vec());
                wrapped = odo.advance();
                prop_assert_eq!(wrapped, step + 1 == total);
            }
            prop_assert!(wrapped);
            prop_assert!(odo.counters().iter().all(|&c| c == 0));
            let mut sorted = seen.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), total);
            // lexicographic order with the last position fastest
            prop_assert_eq!(sorted, seen);
        }
    }
}
