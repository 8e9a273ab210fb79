//! State - dispatch の状態
//!
//! # 状態遷移
//! - idle → resolving → before → proceeding → after → done
//! - before で hook が失敗した場合は after を経由せず終了
//! - proceeding で本体が失敗した場合も after は一度だけ走る

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchPhase {
    Idle,
    Resolving,
    Before,
    Proceeding,
    After,
    Done,
}

impl DispatchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Before => "before",
            Self::Proceeding => "proceeding",
            Self::After => "after",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
