//! MethodTable - marker の明示的な登録テーブル
//!
//! 起動時に (具象型, メソッド名) → marker 列 を登録し、実行時は引くだけ。
//! 登録後は読み取り専用で使う想定なのでロックは持たない。

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::Marker;
use crate::ports::MarkerSource;

/// # 使用例
/// ```ignore
/// let mut table = MethodTable::new();
/// table
///     .mark::<SalesService, _>("create_sale", Transactable::default())
///     .mark::<SalesService, _>("create_sale", Logged);
/// ```
///
/// 同じメソッドへの登録は追記され、その順序が宣言順になる。
#[derive(Default)]
pub struct MethodTable {
    owners: HashMap<String, HashMap<String, Vec<Arc<dyn Marker>>>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self {
            owners: HashMap::new(),
        }
    }

    /// Append one marker to `T::method`.
    pub fn mark<T: ?Sized + 'static, M: Marker>(&mut self, method: &str, marker: M) -> &mut Self {
        self.declare_for(std::any::type_name::<T>(), method, vec![Arc::new(marker)])
    }

    pub fn declare<T: ?Sized + 'static>(
        &mut self,
        method: &str,
        markers: Vec<Arc<dyn Marker>>,
    ) -> &mut Self {
        self.declare_for(std::any::type_name::<T>(), method, markers)
    }

    pub fn declare_for(
        &mut self,
        owner: &str,
        method: &str,
        markers: Vec<Arc<dyn Marker>>,
    ) -> &mut Self {
        self.owners
            .entry(owner.to_string())
            .or_default()
            .entry(method.to_string())
            .or_default()
            .extend(markers);
        self
    }

    pub fn len(&self) -> usize {
        self.owners.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MarkerSource for MethodTable {
    fn markers(&self, owner: &str, method: &str) -> Vec<Arc<dyn Marker>> {
        self.owners
            .get(owner)
            .and_then(|methods| methods.get(method))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct First;
    impl Marker for First {}

    #[derive(Debug)]
    struct Second;
    impl Marker for Second {}

    trait Service {}
    struct ServiceImpl;
    impl Service for ServiceImpl {}

    #[test]
    fn markers_come_back_in_declaration_order() {
        let mut table = MethodTable::new();
        table
            .mark::<ServiceImpl, _>("run", First)
            .mark::<ServiceImpl, _>("run", Second);

        let owner = std::any::type_name::<ServiceImpl>();
        let markers = table.markers(owner, "run");
        assert_eq!(markers.len(), 2);
        assert!(markers[0].is::<First>());
        assert!(markers[1].is::<Second>());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_methods_have_no_markers() {
        let table = MethodTable::new();
        assert!(table.markers("nowhere", "run").is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn trait_level_markers_are_keyed_separately() {
        let mut table = MethodTable::new();
        table.mark::<dyn Service, _>("run", First);

        let concrete = std::any::type_name::<ServiceImpl>();
        assert!(table.markers(concrete, "run").is_empty());
        assert_eq!(
            table.markers(std::any::type_name::<dyn Service>(), "run").len(),
            1
        );
    }
}
