//! Proceed port - 本体の呼び出し
//!
//! 同期呼び出しは `Completion::Ready`、単一値の非同期呼び出しは
//! `Completion::Pending` を返す。Pending は dispatcher が settle するまで待つ。

use futures::future::BoxFuture;

use crate::domain::{Arguments, ReturnValue};
use crate::error::BoxError;

pub type CallResult = Result<Option<ReturnValue>, BoxError>;

pub enum Completion {
    Ready(CallResult),
    Pending(BoxFuture<'static, CallResult>),
}

impl Completion {
    pub fn ready<R: std::any::Any + Send + Sync>(value: R) -> Self {
        Self::Ready(Ok(Some(ReturnValue::new(value))))
    }

    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Ready(Err(error.into()))
    }

    /// Wait for settlement. Ready completions are returned as they are.
    pub async fn settle(self) -> CallResult {
        match self {
            Self::Ready(result) => result,
            Self::Pending(future) => future.await,
        }
    }
}

/// Proceed は現在の引数で本体を一度だけ実行する
pub trait Proceed: Send {
    fn proceed(self: Box<Self>, args: &mut Arguments) -> Completion;
}

impl<F> Proceed for F
where
    F: FnOnce(&mut Arguments) -> Completion + Send,
{
    fn proceed(self: Box<Self>, args: &mut Arguments) -> Completion {
        (*self)(args)
    }
}
