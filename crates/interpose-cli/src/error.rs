use interpose_core::error::{BuildError, RegistryError, SettingsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown product '{0}'")]
    UnknownProduct(String),

    #[error("unknown client '{0}'")]
    UnknownClient(String),

    #[error("there is no sale to remove")]
    NothingToRemove,

    #[error("no active transaction on the handle")]
    NoTransaction,

    #[error("transaction ran for {elapsed_ms}ms, over its {timeout_ms}ms budget")]
    TimedOut { elapsed_ms: u128, timeout_ms: u64 },

    #[error("injected failure in {0}")]
    Injected(&'static str),
}

/// Failures raised by the demo's behaviors.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("{method} takes no transaction handle")]
    MissingTxHandle { method: String },

    #[error("argument {index} of {method} is blank")]
    BlankArgument { method: String, index: usize },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("failed to render the ledger: {0}")]
    Json(#[from] serde_json::Error),
}
