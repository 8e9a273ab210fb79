//! Domain identifiers (strongly-typed IDs).
//!
//! ULID ベースの ID を Phantom type で型付けする。
//! dispatch ごとに `InvocationId` を振り、tracing の span と
//! `InvocationContext` から参照できるようにする。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: 同じプロセス内の dispatch を発生順に並べられる
//! - **分散生成可能**: 調整なしで複数スレッドから生成できる

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdPrefix は各 ID 型のプレフィックスを提供する
pub trait IdPrefix: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "inv-"）
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は実行時にはメモリを消費しないが、異なる ID 同士の混同を防ぐ。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdPrefix> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdPrefix> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdPrefix> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdPrefix> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Invocation のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Invocation {}

impl IdPrefix for Invocation {
    fn prefix() -> &'static str {
        "inv-"
    }
}

pub type InvocationId = Id<Invocation>;
