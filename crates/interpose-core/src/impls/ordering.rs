//! Pyramid / Sequential - OrderingStrategy の実装
//!
//! Pyramid は入れ子のスコープと同じ順序になる。最初に宣言された behavior が
//! 残りすべてを包み、完了や失敗を最後に見る。

use crate::domain::ContextState;
use crate::ports::OrderingStrategy;

#[derive(Debug, Clone, Copy, Default)]
pub struct Pyramid;

impl OrderingStrategy for Pyramid {
    fn name(&self) -> &'static str {
        "pyramid"
    }

    fn order_before(&self, contexts: &[&ContextState]) -> Vec<usize> {
        (0..contexts.len()).collect()
    }

    fn order_after(&self, contexts: &[&ContextState]) -> Vec<usize> {
        (0..contexts.len()).rev().collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl OrderingStrategy for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn order_before(&self, contexts: &[&ContextState]) -> Vec<usize> {
        (0..contexts.len()).collect()
    }

    fn order_after(&self, contexts: &[&ContextState]) -> Vec<usize> {
        (0..contexts.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Marker;
    use crate::ports::is_permutation;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Tag;
    impl Marker for Tag {}

    fn states(n: usize) -> Vec<ContextState> {
        (0..n)
            .map(|i| ContextState::new(Arc::new(Tag), i))
            .collect()
    }

    fn orders(strategy: &dyn OrderingStrategy, n: usize) -> (Vec<usize>, Vec<usize>) {
        let owned = states(n);
        let refs: Vec<&ContextState> = owned.iter().collect();
        (strategy.order_before(&refs), strategy.order_after(&refs))
    }

    #[rstest]
    #[case::pyramid_empty(&Pyramid, 0, vec![], vec![])]
    #[case::pyramid_one(&Pyramid, 1, vec![0], vec![0])]
    #[case::pyramid_three(&Pyramid, 3, vec![0, 1, 2], vec![2, 1, 0])]
    #[case::sequential_three(&Sequential, 3, vec![0, 1, 2], vec![0, 1, 2])]
    fn traversal_orders(
        #[case] strategy: &dyn OrderingStrategy,
        #[case] n: usize,
        #[case] before: Vec<usize>,
        #[case] after: Vec<usize>,
    ) {
        assert_eq!(orders(strategy, n), (before, after));
    }

    proptest! {
        #[test]
        fn pyramid_after_is_reverse_of_before(n in 0usize..64) {
            let (before, after) = orders(&Pyramid, n);
            prop_assert!(is_permutation(&before, n));
            prop_assert!(is_permutation(&after, n));
            let mut reversed = before.clone();
            reversed.reverse();
            prop_assert_eq!(after, reversed);
        }

        #[test]
        fn sequential_keeps_declaration_order(n in 0usize..64) {
            let (before, after) = orders(&Sequential, n);
            let identity: Vec<usize> = (0..n).collect();
            prop_assert_eq!(&before, &identity);
            prop_assert_eq!(&after, &identity);
        }

        #[test]
        fn strategies_are_deterministic(n in 0usize..32) {
            prop_assert_eq!(orders(&Pyramid, n), orders(&Pyramid, n));
            prop_assert_eq!(orders(&Sequential, n), orders(&Sequential, n));
        }
    }
}
