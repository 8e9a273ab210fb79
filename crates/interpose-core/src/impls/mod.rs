//! Impls - ports の標準実装
//!
//! # 含まれる実装
//! - **Pyramid / Sequential**: OrderingStrategy
//! - **MethodTable**: MarkerSource（明示的な登録テーブル）
//!
//! BehaviorFactory の標準実装は `typed::BehaviorRegistry`。

pub mod method_table;
pub mod ordering;

// 主要な型を再エクスポート
pub use self::method_table::MethodTable;
pub use self::ordering::{Pyramid, Sequential};
