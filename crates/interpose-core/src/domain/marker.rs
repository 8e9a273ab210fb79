//! Marker - メソッドに付ける宣言的な印
//!
//! attribute/reflection の代わりに、marker の型そのものを kind として使う。
//! 登録テーブルは `MarkerKind`（TypeId + 型名）で引く。

use std::any::{Any, TypeId};
use std::fmt;

/// Marker はメソッドに宣言される印
///
/// # 使用例
/// ```ignore
/// #[derive(Debug, Default)]
/// struct Transactable {
///     timeout_ms: u64,
/// }
///
/// impl Marker for Transactable {}
/// ```
///
/// marker は値を持てる（タイムアウトなど）。behavior は
/// `InvocationContext::marker::<M>()` で自分を起動した marker を読む。
pub trait Marker: Any + Send + Sync + fmt::Debug {
    fn kind(&self) -> MarkerKind {
        MarkerKind {
            id: TypeId::of::<Self>(),
            name: std::any::type_name::<Self>(),
        }
    }
}

impl dyn Marker {
    pub fn is<M: Marker>(&self) -> bool {
        self.kind().id == TypeId::of::<M>()
    }

    pub fn downcast_ref<M: Marker>(&self) -> Option<&M> {
        let any: &dyn Any = self;
        any.downcast_ref::<M>()
    }
}

/// Identifier of a marker type. Equality only looks at the `TypeId`.
#[derive(Debug, Clone, Copy)]
pub struct MarkerKind {
    id: TypeId,
    name: &'static str,
}

impl MarkerKind {
    pub fn of<M: Marker>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for MarkerKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MarkerKind {}

impl std::hash::Hash for MarkerKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identifier of a behavior type, handed to the `BehaviorFactory`.
///
/// `name` is for diagnostics only; lookups go through `id`.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorType {
    id: TypeId,
    name: &'static str,
}

impl BehaviorType {
    pub fn of<B: 'static>() -> Self {
        Self {
            id: TypeId::of::<B>(),
            name: std::any::type_name::<B>(),
        }
    }

    /// 型消去された実体 `T` で識別しつつ、表示名だけ `D` にする
    pub fn erased<T: 'static, D: ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<D>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for BehaviorType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BehaviorType {}

impl std::hash::Hash for BehaviorType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
