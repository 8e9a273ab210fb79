//! Typed - behavior の hook と登録
//!
//! marker の型と behavior の対応付けを静的に書けるようにする。
//!
//! # 二層構造
//! - **表層（Typed）**: `Interceptor<M>` trait - marker を型付きで受け取る
//! - **内部（Dyn）**: `Behavior` trait - object-safe, type erasure

pub mod behavior;
pub mod registry;

// 主要な trait/型 を再エクスポート
pub use self::behavior::{Behavior, Interceptor, TypedBehavior};
pub use self::registry::BehaviorRegistry;
