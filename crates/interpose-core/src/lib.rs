//! interpose-core
//!
//! Marker-driven interceptor dispatch: behaviors bound to markers on a method
//! run before and after the underlying call.
//!
//! # モジュール構成
//! - **domain**: 値の型（marker, arguments, return slot, invocation context, ids）
//! - **ports**: 抽象化レイヤー（OrderingStrategy, MarkerSource, BehaviorFactory, Proceed, Clock, IdGenerator）
//! - **typed**: hook の定義（Behavior, Interceptor, BehaviorRegistry）
//! - **impls**: 標準実装（Pyramid, Sequential, MethodTable）
//! - **app**: 解決と実行（Configuration, Resolver, Dispatcher, Proxy, Settings）
//! - **error**: エラー型

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod typed;

pub use self::app::{Configuration, Dispatcher, DispatcherBuilder, Proxy, Settings};
pub use self::domain::{Arguments, InvocationContext, Marker, MarkerKind, MethodInfo, ReturnValue};
pub use self::error::{BoxError, DispatchError};
pub use self::typed::{Behavior, Interceptor};
