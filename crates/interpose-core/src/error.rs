//! Errors - dispatch パイプラインのエラー型
//!
//! - `ConfigurationError`: 解決時の設定不備（hook も本体も走らない）
//! - `DispatchError`: 呼び出し側が受け取るエラー
//! - `ContextError`: InvocationContext のアクセサ失敗
//! - `RegistryError` / `BuildError`: 起動時のワイヤリング失敗

use thiserror::Error;

use crate::domain::DispatchPhase;

/// Failure raised by user code: an underlying call or a behavior hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("marker '{marker}' on {method} has no configured behavior")]
    UnmappedMarker { marker: &'static str, method: String },

    #[error("behavior '{behavior}' could not be constructed: {source}")]
    BehaviorUnavailable {
        behavior: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("ordering strategy '{strategy}' did not return a permutation for the {phase} phase")]
    InvalidOrdering {
        strategy: &'static str,
        phase: DispatchPhase,
    },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("invocation of {method} failed: {source}")]
    Invocation {
        method: String,
        #[source]
        source: BoxError,
    },

    /// `suppressed` は last-failure-wins で上書きされた失敗の数
    #[error("{phase} hook of '{behavior}' failed: {source}")]
    Hook {
        phase: DispatchPhase,
        behavior: &'static str,
        suppressed: usize,
        #[source]
        source: BoxError,
    },

    #[error("return value of {method} is not a {expected}")]
    ReturnTypeMismatch {
        method: String,
        expected: &'static str,
    },

    #[error("{method} produced no return value")]
    MissingReturnValue { method: String },
}

impl DispatchError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self, Self::Invocation { .. })
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, Self::Hook { .. })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("argument index {index} is out of range (len={len})")]
    ArgumentOutOfRange { index: usize, len: usize },

    #[error("argument {index} is declared as {actual}, not {expected}")]
    ArgumentTypeMismatch {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("return slot expects {expected}, got {actual}")]
    ReturnTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("return value was already overridden")]
    ReturnSlotFilled,

    #[error("return value cannot be overridden after the call has proceeded")]
    ReturnSlotSealed,

    #[error("context is bound to marker {actual}, not {expected}")]
    MarkerMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("behavior '{0}' is already registered")]
    AlreadyRegistered(&'static str),

    #[error("behavior '{0}' is not registered")]
    NotRegistered(&'static str),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing mappings for markers: {0:?}. These markers were expected but have no behavior.")]
    MissingMappings(Vec<&'static str>),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown ordering strategy '{0}' (expected pyramid or sequential)")]
    UnknownOrdering(String),
}
