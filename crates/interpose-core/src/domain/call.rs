//! Call - 呼び出し対象のメソッド情報と戻り値スロット
//!
//! 戻り値は型消去された `ReturnValue` として扱う。
//! 非同期呼び出しの値は dispatcher が settle させてからスロットに入る。

use std::any::{Any, TypeId};
use std::fmt;

use crate::error::ContextError;

/// Shape of the underlying call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    Sync,
    /// Single-value asynchronous completion. A `()` return type means a
    /// value-less completion, observed as `None`.
    Async,
}

/// Declared return type of a method.
#[derive(Debug, Clone, Copy)]
pub struct ReturnType {
    id: TypeId,
    name: &'static str,
}

impl ReturnType {
    pub fn of<R: Any>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            name: std::any::type_name::<R>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_unit(&self) -> bool {
        self.id == TypeId::of::<()>()
    }

    pub fn matches(&self, value: &ReturnValue) -> bool {
        self.id == value.value_type_id()
    }
}

impl PartialEq for ReturnType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ReturnType {}

/// Identity of the invoked method: the concrete owner type and method name.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    owner: &'static str,
    name: &'static str,
    shape: CallShape,
    returns: ReturnType,
}

impl MethodInfo {
    pub fn new(owner: &'static str, name: &'static str, shape: CallShape, returns: ReturnType) -> Self {
        Self {
            owner,
            name,
            shape,
            returns,
        }
    }

    pub fn sync<R: Any>(owner: &'static str, name: &'static str) -> Self {
        Self::new(owner, name, CallShape::Sync, ReturnType::of::<R>())
    }

    pub fn asynchronous<R: Any>(owner: &'static str, name: &'static str) -> Self {
        Self::new(owner, name, CallShape::Async, ReturnType::of::<R>())
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> CallShape {
        self.shape
    }

    pub fn returns(&self) -> ReturnType {
        self.returns
    }

    pub fn is_async(&self) -> bool {
        self.shape == CallShape::Async
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

/// A type-erased return value.
pub struct ReturnValue {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl ReturnValue {
    pub fn new<R: Any + Send + Sync>(value: R) -> Self {
        Self {
            type_name: std::any::type_name::<R>(),
            value: Box::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<R: Any>(&self) -> bool {
        self.value.is::<R>()
    }

    pub fn downcast_ref<R: Any>(&self) -> Option<&R> {
        self.value.downcast_ref::<R>()
    }

    /// Returns the value back on mismatch.
    pub fn downcast<R: Any>(self) -> Result<R, Self> {
        let type_name = self.type_name;
        self.value
            .downcast::<R>()
            .map(|boxed| *boxed)
            .map_err(|value| Self { type_name, value })
    }

    fn value_type_id(&self) -> TypeId {
        (*self.value).type_id()
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// One-shot return slot of a call.
///
/// hook からの override は一度だけ。dispatcher による本体の結果書き込みは
/// `complete` で行い、こちらは override を上書きする。
#[derive(Debug, Default)]
pub struct ReturnSlot {
    state: SlotState,
}

#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Empty,
    Overridden(Option<ReturnValue>),
    Completed(Option<ReturnValue>),
}

impl ReturnSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an override. Synchronous calls take the value as is; for
    /// asynchronous calls it stands for an already-settled completion, so the
    /// value must have the declared element type (or be `None` for a
    /// value-less completion).
    pub fn override_with(
        &mut self,
        returns: ReturnType,
        value: Option<ReturnValue>,
    ) -> Result<(), ContextError> {
        if !matches!(self.state, SlotState::Empty) {
            return Err(ContextError::ReturnSlotFilled);
        }
        if let Some(v) = &value
            && !returns.matches(v)
        {
            return Err(ContextError::ReturnTypeMismatch {
                expected: returns.name(),
                actual: v.type_name(),
            });
        }
        self.state = SlotState::Overridden(value);
        Ok(())
    }

    pub(crate) fn complete(&mut self, value: Option<ReturnValue>) {
        self.state = SlotState::Completed(value);
    }

    pub fn value(&self) -> Option<&ReturnValue> {
        match &self.state {
            SlotState::Empty => None,
            SlotState::Overridden(v) | SlotState::Completed(v) => v.as_ref(),
        }
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self.state, SlotState::Overridden(_))
    }

    pub fn take(self) -> Option<ReturnValue> {
        match self.state {
            SlotState::Empty => None,
            SlotState::Overridden(v) | SlotState::Completed(v) => v,
        }
    }
}
