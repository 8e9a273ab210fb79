//! MarkerSource port - メソッドに宣言された marker を返す
//!
//! reflection の代わりに、起動時に作る登録テーブル（`MethodTable`）が実装する。

use std::sync::Arc;

use crate::domain::Marker;

/// MarkerSource はメソッドの marker を宣言順で返す
///
/// `owner` は呼び出された具象型の名前。trait の名前で登録された marker は
/// 具象型のメソッドからは見えない。
pub trait MarkerSource: Send + Sync {
    fn markers(&self, owner: &str, method: &str) -> Vec<Arc<dyn Marker>>;
}
