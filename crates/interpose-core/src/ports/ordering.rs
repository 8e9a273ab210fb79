//! OrderingStrategy port - before / after の走査順を決める
//!
//! # 実装
//! - **Pyramid**（デフォルト）: before は宣言順、after は逆順
//! - **Sequential**: どちらも宣言順

use crate::domain::ContextState;

/// OrderingStrategy は解決済み context 列の走査順を返す
///
/// 戻り値は入力の index 列。純粋な置換でなければならない
/// （追加・欠落・重複なし、同じ入力には同じ順序）。
/// dispatcher は hook を呼ぶ前に `is_permutation` で検査する。
pub trait OrderingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn order_before(&self, contexts: &[&ContextState]) -> Vec<usize>;

    /// Also the order of the error-marking pass.
    fn order_after(&self, contexts: &[&ContextState]) -> Vec<usize>;
}

/// `order` visits every index in `0..len` exactly once.
pub fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &index in order {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(&[], 0, true)]
    #[case::identity(&[0, 1, 2], 3, true)]
    #[case::reversed(&[2, 1, 0], 3, true)]
    #[case::dropped(&[0, 1], 3, false)]
    #[case::duplicated(&[0, 0, 1], 3, false)]
    #[case::out_of_range(&[0, 1, 3], 3, false)]
    #[case::extra(&[0, 1, 2, 0], 3, false)]
    fn permutation_check(#[case] order: &[usize], #[case] len: usize, #[case] expected: bool) {
        assert_eq!(is_permutation(order, len), expected);
    }
}
