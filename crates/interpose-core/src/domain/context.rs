//! InvocationContext - 1 回の呼び出しにおける (marker, behavior) ごとの状態
//!
//! # 構成
//! - **ContextState**: marker, 宣言順, bypass / errored フラグ（dispatcher が保持）
//! - **Scratch**: 同じ呼び出しを担当する behavior 間で共有する KV ストア
//! - **InvocationContext**: hook に渡すビュー。引数と戻り値スロットへのアクセサを持つ
//!
//! # 不変条件
//! - `errored` は単調（一度立ったら戻らない）
//! - `bypassed` が効くのは同期呼び出しだけ

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::arguments::Arguments;
use super::call::{MethodInfo, ReturnSlot, ReturnValue};
use super::ids::InvocationId;
use super::marker::Marker;
use crate::error::ContextError;

type ScratchValue = Arc<dyn Any + Send + Sync>;

/// Key-value store shared by every context of one dispatch.
///
/// Cloning yields another handle to the same store, so hook code can move a
/// handle into work it spawns.
#[derive(Clone, Default)]
pub struct Scratch {
    inner: Arc<RwLock<HashMap<String, ScratchValue>>>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` under `key` unless the key is already present.
    /// Returns whether the value was stored.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> bool {
        let mut map = self.inner.write();
        let key = key.into();
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, Arc::new(value));
        true
    }

    /// Stores `value` under `key`, overwriting any previous entry.
    pub fn replace<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> bool {
        self.inner.write().insert(key.into(), Arc::new(value)).is_some()
    }

    /// `None` when the key is absent or holds another type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.inner.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl fmt::Debug for Scratch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.inner.read();
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        f.debug_struct("Scratch").field("keys", &keys).finish()
    }
}

/// Per-context flags and identity, owned by the dispatcher for one call.
#[derive(Debug)]
pub struct ContextState {
    marker: Arc<dyn Marker>,
    declaration_order: usize,
    bypassed: bool,
    errored: bool,
}

impl ContextState {
    pub fn new(marker: Arc<dyn Marker>, declaration_order: usize) -> Self {
        Self {
            marker,
            declaration_order,
            bypassed: false,
            errored: false,
        }
    }

    pub fn marker(&self) -> &(dyn Marker + 'static) {
        self.marker.as_ref()
    }

    pub fn declaration_order(&self) -> usize {
        self.declaration_order
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    pub(crate) fn bypass(&mut self) {
        self.bypassed = true;
    }

    pub(crate) fn mark_errored(&mut self) {
        self.errored = true;
    }
}

/// Return slot access. After the call has proceeded the slot is sealed and
/// only its settled value can be read.
pub(crate) enum SlotAccess<'a> {
    Open(&'a mut ReturnSlot),
    Sealed(Option<&'a ReturnValue>),
}

/// View of one context handed to a behavior hook.
pub struct InvocationContext<'a> {
    invocation_id: InvocationId,
    method: &'a MethodInfo,
    markers: &'a [Arc<dyn Marker>],
    state: &'a mut ContextState,
    scratch: &'a Scratch,
    arguments: &'a mut Arguments,
    slot: SlotAccess<'a>,
}

impl<'a> InvocationContext<'a> {
    pub(crate) fn new(
        invocation_id: InvocationId,
        method: &'a MethodInfo,
        markers: &'a [Arc<dyn Marker>],
        state: &'a mut ContextState,
        scratch: &'a Scratch,
        arguments: &'a mut Arguments,
        slot: SlotAccess<'a>,
    ) -> Self {
        Self {
            invocation_id,
            method,
            markers,
            state,
            scratch,
            arguments,
            slot,
        }
    }

    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    pub fn method(&self) -> &MethodInfo {
        self.method
    }

    pub fn declaration_order(&self) -> usize {
        self.state.declaration_order()
    }

    /// The marker that bound this context's behavior.
    pub fn owning_marker(&self) -> &(dyn Marker + 'static) {
        self.state.marker()
    }

    /// Owned handle to the owning marker, for use across `&mut self` calls.
    pub fn shared_marker(&self) -> Arc<dyn Marker> {
        Arc::clone(&self.state.marker)
    }

    pub fn marker<M: Marker>(&self) -> Option<&M> {
        self.state.marker().downcast_ref::<M>()
    }

    /// First marker of type `M` declared on the method, whichever context
    /// it belongs to.
    pub fn find_marker<M: Marker>(&self) -> Option<&M> {
        self.markers.iter().find_map(|m| m.downcast_ref::<M>())
    }

    pub fn scratch(&self) -> &Scratch {
        self.scratch
    }

    /// Skip the underlying call. Only honored for synchronous calls; pair
    /// it with `override_return_value`.
    pub fn bypass_invocation(&mut self) {
        self.state.bypass();
    }

    pub fn is_bypassed(&self) -> bool {
        self.state.is_bypassed()
    }

    pub fn mark_errored(&mut self) {
        self.state.mark_errored();
    }

    pub fn is_errored(&self) -> bool {
        self.state.is_errored()
    }

    pub fn arguments(&self) -> &Arguments {
        self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Arguments {
        self.arguments
    }

    pub fn argument<T: Any>(&self, index: usize) -> Result<&T, ContextError> {
        self.arguments.get(index)
    }

    pub fn set_argument<T: Any + Send + Sync>(
        &mut self,
        index: usize,
        value: T,
    ) -> Result<(), ContextError> {
        self.arguments.set(index, value)
    }

    pub fn position_of<T: Any>(&self) -> Option<usize> {
        self.arguments.position_of::<T>()
    }

    /// The call's result as behaviors observe it: `None` once this context is
    /// errored, the settled value for asynchronous calls (`None` when the
    /// completion carries no value), the raw value otherwise.
    pub fn return_value(&self) -> Option<&ReturnValue> {
        if self.state.is_errored() {
            return None;
        }
        match &self.slot {
            SlotAccess::Open(slot) => slot.value(),
            SlotAccess::Sealed(value) => *value,
        }
    }

    /// Override the result. Meant for Before hooks together with
    /// `bypass_invocation`; fails once the call has proceeded.
    pub fn override_return_value<R: Any + Send + Sync>(
        &mut self,
        value: R,
    ) -> Result<(), ContextError> {
        let returns = self.method.returns();
        let SlotAccess::Open(slot) = &mut self.slot else {
            return Err(ContextError::ReturnSlotSealed);
        };
        let value = ReturnValue::new(value);
        if !returns.matches(&value) {
            return Err(ContextError::ReturnTypeMismatch {
                expected: returns.name(),
                actual: value.type_name(),
            });
        }
        if self.method.is_async() && returns.is_unit() {
            slot.override_with(returns, None)
        } else {
            slot.override_with(returns, Some(value))
        }
    }
}

impl fmt::Debug for InvocationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("invocation_id", &self.invocation_id)
            .field("method", &self.method.to_string())
            .field("state", &self.state)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::ReturnType;
    use ulid::Ulid;

    #[derive(Debug)]
    struct Audited;
    impl Marker for Audited {}

    #[derive(Debug)]
    struct Timed {
        budget_ms: u64,
    }
    impl Marker for Timed {}

    fn invocation_id() -> InvocationId {
        InvocationId::from(Ulid::from_parts(1, 1))
    }

    #[test]
    fn scratch_insert_keeps_the_first_value() {
        let scratch = Scratch::new();
        assert!(scratch.insert("tx", 1_u32));
        assert!(!scratch.insert("tx", 2_u32));
        assert_eq!(scratch.get::<u32>("tx").as_deref(), Some(&1));

        assert!(scratch.replace("tx", 3_u32));
        assert_eq!(scratch.get::<u32>("tx").as_deref(), Some(&3));
        assert!(scratch.get::<String>("tx").is_none());

        assert!(scratch.remove("tx"));
        assert!(scratch.is_empty());
    }

    #[test]
    fn scratch_tolerates_concurrent_writers() {
        let scratch = Scratch::new();
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let scratch = scratch.clone();
                std::thread::spawn(move || {
                    scratch.insert("shared", n);
                    scratch.insert(format!("own-{n}"), n);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(scratch.len(), 9);
        assert!(scratch.get::<i32>("shared").is_some());
    }

    #[test]
    fn errored_context_hides_the_return_value() {
        let method = MethodInfo::sync::<u32>("svc::Calc", "add");
        let markers: Vec<Arc<dyn Marker>> = vec![Arc::new(Audited)];
        let mut state = ContextState::new(markers[0].clone(), 0);
        let scratch = Scratch::new();
        let mut args = Arguments::new();
        let value = ReturnValue::new(5_u32);

        let mut cx = InvocationContext::new(
            invocation_id(),
            &method,
            &markers,
            &mut state,
            &scratch,
            &mut args,
            SlotAccess::Sealed(Some(&value)),
        );
        assert_eq!(cx.return_value().and_then(|v| v.downcast_ref::<u32>()), Some(&5));
        assert_eq!(
            cx.override_return_value(1_u32).unwrap_err(),
            ContextError::ReturnSlotSealed
        );

        cx.mark_errored();
        assert!(cx.return_value().is_none());
        assert!(state.is_errored());
    }

    #[test]
    fn markers_are_reachable_by_type() {
        let method = MethodInfo::sync::<()>("svc::Calc", "reset");
        let markers: Vec<Arc<dyn Marker>> =
            vec![Arc::new(Audited), Arc::new(Timed { budget_ms: 250 })];
        let mut state = ContextState::new(markers[0].clone(), 0);
        let scratch = Scratch::new();
        let mut args = Arguments::new();
        let mut slot = ReturnSlot::new();

        let cx = InvocationContext::new(
            invocation_id(),
            &method,
            &markers,
            &mut state,
            &scratch,
            &mut args,
            SlotAccess::Open(&mut slot),
        );
        assert!(cx.marker::<Audited>().is_some());
        assert!(cx.marker::<Timed>().is_none());
        assert_eq!(cx.find_marker::<Timed>().map(|t| t.budget_ms), Some(250));
        assert!(cx.owning_marker().is::<Audited>());
    }

    #[test]
    fn override_on_async_unit_settles_without_a_value() {
        let method = MethodInfo::asynchronous::<()>("svc::Calc", "flush");
        let markers: Vec<Arc<dyn Marker>> = vec![Arc::new(Audited)];
        let mut state = ContextState::new(markers[0].clone(), 0);
        let scratch = Scratch::new();
        let mut args = Arguments::new();
        let mut slot = ReturnSlot::new();

        let mut cx = InvocationContext::new(
            invocation_id(),
            &method,
            &markers,
            &mut state,
            &scratch,
            &mut args,
            SlotAccess::Open(&mut slot),
        );
        cx.override_return_value(()).unwrap();
        assert!(cx.return_value().is_none());
        drop(cx);
        assert!(slot.is_overridden());
        assert_eq!(ReturnType::of::<()>(), method.returns());
    }

    #[test]
    fn override_on_async_unit_still_checks_the_type() {
        let method = MethodInfo::asynchronous::<()>("svc::Calc", "flush");
        let markers: Vec<Arc<dyn Marker>> = vec![Arc::new(Audited)];
        let mut state = ContextState::new(markers[0].clone(), 0);
        let scratch = Scratch::new();
        let mut args = Arguments::new();
        let mut slot = ReturnSlot::new();

        let mut cx = InvocationContext::new(
            invocation_id(),
            &method,
            &markers,
            &mut state,
            &scratch,
            &mut args,
            SlotAccess::Open(&mut slot),
        );
        assert_eq!(
            cx.override_return_value(42_u32).unwrap_err(),
            ContextError::ReturnTypeMismatch {
                expected: "()",
                actual: "u32",
            }
        );
        drop(cx);
        assert!(!slot.is_overridden());
    }
}
