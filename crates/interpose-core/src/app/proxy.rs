//! Proxy - 対象オブジェクトへの呼び出しを Dispatcher 経由にする
//!
//! 実行時のプロキシ生成の代わりに、メソッド本体をクロージャで受け取る。
//! marker は `(type_name::<T>(), メソッド名)` で MarkerSource から引く。
//! owner は常に具象型の名前なので、trait 名で登録した marker は見つからない。
//!
//! # 使用例
//! ```ignore
//! let sales = Proxy::new(SalesService::new(ledger), dispatcher, table);
//! let sale = sales
//!     .call("create_sale", Arguments::new().with(tx).with(order), |svc, args| {
//!         svc.create_sale(args.get::<TxHandle>(0)?, args.get::<Order>(1)?)
//!     })
//!     .await?;
//! ```

use std::any::{Any, type_name};
use std::future::Future;
use std::sync::Arc;

use crate::app::dispatcher::Dispatcher;
use crate::domain::{Arguments, MethodInfo, ReturnValue};
use crate::error::{BoxError, DispatchError};
use crate::ports::{Completion, MarkerSource, Proceed};

pub struct Proxy<T> {
    target: Arc<T>,
    dispatcher: Arc<Dispatcher>,
    markers: Arc<dyn MarkerSource>,
}

impl<T: Send + Sync + 'static> Proxy<T> {
    pub fn new(target: T, dispatcher: Arc<Dispatcher>, markers: Arc<dyn MarkerSource>) -> Self {
        Self::from_arc(Arc::new(target), dispatcher, markers)
    }

    pub fn from_arc(target: Arc<T>, dispatcher: Arc<Dispatcher>, markers: Arc<dyn MarkerSource>) -> Self {
        Self {
            target,
            dispatcher,
            markers,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Owner name used for marker lookup.
    pub fn owner(&self) -> &'static str {
        type_name::<T>()
    }

    /// Synchronous call shape.
    pub async fn call<R, F>(&self, method: &'static str, arguments: Arguments, body: F) -> Result<R, DispatchError>
    where
        R: Any + Send + Sync,
        F: FnOnce(&T, &mut Arguments) -> Result<R, BoxError> + Send,
    {
        let info = MethodInfo::sync::<R>(self.owner(), method);
        let target = self.target.as_ref();
        let proceed = move |args: &mut Arguments| match body(target, args) {
            Ok(value) => Completion::ready(value),
            Err(err) => Completion::failed(err),
        };
        let value = self.dispatch(&info, arguments, Box::new(proceed)).await?;
        into_typed(&info, value)
    }

    /// Single-value asynchronous call shape. The body receives its own
    /// handle to the target so the returned future can outlive the borrow.
    pub async fn call_async<R, F, Fut>(
        &self,
        method: &'static str,
        arguments: Arguments,
        body: F,
    ) -> Result<R, DispatchError>
    where
        R: Any + Send + Sync,
        F: FnOnce(Arc<T>, &mut Arguments) -> Fut + Send,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        let info = MethodInfo::asynchronous::<R>(self.owner(), method);
        let value = self
            .dispatch(&info, arguments, Box::new(self.pending(body)))
            .await?;
        into_typed(&info, value)
    }

    /// Value-less asynchronous call shape.
    pub async fn call_async_unit<F, Fut>(
        &self,
        method: &'static str,
        arguments: Arguments,
        body: F,
    ) -> Result<(), DispatchError>
    where
        F: FnOnce(Arc<T>, &mut Arguments) -> Fut + Send,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.call_async::<(), _, _>(method, arguments, body).await
    }

    fn pending<R, F, Fut>(&self, body: F) -> impl FnOnce(&mut Arguments) -> Completion + Send
    where
        R: Any + Send + Sync,
        F: FnOnce(Arc<T>, &mut Arguments) -> Fut + Send,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        let target = Arc::clone(&self.target);
        move |args: &mut Arguments| {
            let future = body(target, args);
            Completion::Pending(Box::pin(async move {
                future.await.map(|value| Some(ReturnValue::new(value)))
            }))
        }
    }

    async fn dispatch(
        &self,
        info: &MethodInfo,
        arguments: Arguments,
        proceed: Box<dyn Proceed + '_>,
    ) -> Result<Option<ReturnValue>, DispatchError> {
        let markers = self.markers.markers(info.owner(), info.name());
        self.dispatcher
            .dispatch(info, &markers, arguments, proceed)
            .await
    }
}

impl<T> Clone for Proxy<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            dispatcher: Arc::clone(&self.dispatcher),
            markers: Arc::clone(&self.markers),
        }
    }
}

/// A value-less result stands for `()` when that is the declared type.
fn into_typed<R: Any>(method: &MethodInfo, value: Option<ReturnValue>) -> Result<R, DispatchError> {
    let value = match value {
        Some(value) => value,
        None if method.returns().is_unit() => ReturnValue::new(()),
        None => {
            return Err(DispatchError::MissingReturnValue {
                method: method.to_string(),
            });
        }
    };
    value
        .downcast::<R>()
        .map_err(|_| DispatchError::ReturnTypeMismatch {
            method: method.to_string(),
            expected: type_name::<R>(),
        })
}
