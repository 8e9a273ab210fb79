//! Ports - 協調者とのインターフェース
//!
//! dispatch core が外部に委ねるものを trait として定義する。
//!
//! - marker の取得（MarkerSource）
//! - behavior の生成（BehaviorFactory）
//! - 本体の実行（Proceed）
//! - 走査順の決定（OrderingStrategy）
//! - ID / 時刻（IdGenerator, Clock）

pub mod behavior_factory;
pub mod clock;
pub mod id_generator;
pub mod marker_source;
pub mod ordering;
pub mod proceed;

// 主要な trait を再エクスポート
pub use self::behavior_factory::BehaviorFactory;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::marker_source::MarkerSource;
pub use self::ordering::{OrderingStrategy, is_permutation};
pub use self::proceed::{CallResult, Completion, Proceed};
