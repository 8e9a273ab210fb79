//! BehaviorFactory port - behavior の生成を外部に委ねる
//!
//! core は factory を不透明な呼び出しとして扱う。依存の解決は factory 側の責務。

use crate::domain::BehaviorType;
use crate::error::BoxError;
use crate::typed::Behavior;

/// BehaviorFactory は behavior 型から使える状態のインスタンスを作る
///
/// # 生成ポリシー
/// - 呼び出しごとに新しいインスタンスを返す（プールしない）
/// - behavior のフィールドは 1 回の呼び出しに閉じるのでロック不要
pub trait BehaviorFactory: Send + Sync {
    fn create(&self, behavior: &BehaviorType) -> Result<Box<dyn Behavior>, BoxError>;
}
