//! Behavior trait - 横断的な処理の hook 定義
//!
//! # 二層構造
//! - **表層（Typed）**: `Interceptor<M>` - 自分を起動した marker を `&M` で受け取る
//! - **内部（Dyn）**: `Behavior` - object-safe、dispatcher はこちらだけを扱う
//!
//! `TypedBehavior<M, I>` が `Interceptor<M>` を `dyn Behavior` に型消去する。

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{BehaviorType, InvocationContext, Marker, ReturnValue};
use crate::error::{BoxError, ContextError};

/// Behavior は before / after の hook を持つ
///
/// # Object Safety
/// - メソッドはジェネリックではない
/// - `Box<dyn Behavior>` として resolver が context ごとに保持する
///
/// インスタンスは呼び出しごとに作られるので、`&mut self` のフィールドは
/// その呼び出しの間だけ有効な状態として使ってよい。
#[async_trait]
pub trait Behavior: Send {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn before_invoke(&mut self, _cx: &mut InvocationContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }

    /// `result` is `None` whenever the context is errored.
    async fn after_invoke(
        &mut self,
        _cx: &mut InvocationContext<'_>,
        _result: Option<&ReturnValue>,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Interceptor は特定の marker 型に束縛された behavior
///
/// # 使用例
/// ```ignore
/// struct Timing {
///     started: Option<Instant>,
/// }
///
/// #[async_trait]
/// impl Interceptor<Timed> for Timing {
///     async fn before(&mut self, _marker: &Timed, _cx: &mut InvocationContext<'_>) -> Result<(), BoxError> {
///         self.started = Some(Instant::now());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor<M: Marker>: Send + 'static {
    async fn before(
        &mut self,
        _marker: &M,
        _cx: &mut InvocationContext<'_>,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    async fn after(
        &mut self,
        _marker: &M,
        _cx: &mut InvocationContext<'_>,
        _result: Option<&ReturnValue>,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

pub struct TypedBehavior<M: Marker, I: Interceptor<M>> {
    interceptor: I,
    _marker: PhantomData<M>,
}

impl<M: Marker, I: Interceptor<M>> TypedBehavior<M, I> {
    pub fn new(interceptor: I) -> Self {
        Self {
            interceptor,
            _marker: PhantomData,
        }
    }

    /// Identified by the erased wrapper, displayed as `I`.
    pub fn behavior_type() -> BehaviorType {
        BehaviorType::erased::<Self, I>()
    }

    pub fn into_inner(self) -> I {
        self.interceptor
    }
}

fn owning<M: Marker>(marker: &Arc<dyn Marker>) -> Result<&M, BoxError> {
    marker.downcast_ref::<M>().ok_or_else(|| {
        ContextError::MarkerMismatch {
            expected: std::any::type_name::<M>(),
            actual: marker.kind().name(),
        }
        .into()
    })
}

#[async_trait]
impl<M: Marker, I: Interceptor<M>> Behavior for TypedBehavior<M, I> {
    fn name(&self) -> &'static str {
        std::any::type_name::<I>()
    }

    async fn before_invoke(&mut self, cx: &mut InvocationContext<'_>) -> Result<(), BoxError> {
        let handle = cx.shared_marker();
        let marker = owning::<M>(&handle)?;
        self.interceptor.before(marker, cx).await
    }

    async fn after_invoke(
        &mut self,
        cx: &mut InvocationContext<'_>,
        result: Option<&ReturnValue>,
    ) -> Result<(), BoxError> {
        let handle = cx.shared_marker();
        let marker = owning::<M>(&handle)?;
        self.interceptor.after(marker, cx, result).await
    }
}
