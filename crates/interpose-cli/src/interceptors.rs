//! Demo markers and the behaviors bound to them.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use interpose_core::domain::{InvocationContext, Marker, ReturnValue};
use interpose_core::error::BoxError;
use interpose_core::typed::Interceptor;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{HookError, LedgerError};
use crate::ledger::{Isolation, Ledger, TxHandle};

const TX_ID_KEY: &str = "tx.id";

/// Run the method inside a transaction on its `TxHandle` argument.
#[derive(Debug, Clone, Copy)]
pub struct Transactable {
    pub isolation: Isolation,
    pub timeout_ms: u64,
}

impl Default for Transactable {
    fn default() -> Self {
        Self {
            isolation: Isolation::ReadCommitted,
            timeout_ms: 60_000,
        }
    }
}

impl Marker for Transactable {}

#[derive(Debug, Clone, Copy, Default)]
pub struct Logged;

impl Marker for Logged {}

/// Reject blank string arguments; with `normalize`, trim the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validated {
    pub normalize: bool,
}

impl Marker for Validated {}

pub struct TransactionInterceptor {
    ledger: Arc<Ledger>,
    tx: Option<TxHandle>,
    owns: bool,
    started: Option<Instant>,
}

impl TransactionInterceptor {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            tx: None,
            owns: false,
            started: None,
        }
    }
}

#[async_trait]
impl Interceptor<Transactable> for TransactionInterceptor {
    async fn before(&mut self, marker: &Transactable, cx: &mut InvocationContext<'_>) -> Result<(), BoxError> {
        let index = cx
            .position_of::<TxHandle>()
            .ok_or_else(|| HookError::MissingTxHandle {
                method: cx.method().to_string(),
            })?;
        let tx = cx.argument::<TxHandle>(index)?.clone();

        self.owns = tx.begin(marker.isolation);
        if self.owns {
            debug!(tx = ?tx.id(), isolation = ?marker.isolation, "transaction started");
        } else {
            debug!(tx = ?tx.id(), "joining the active transaction");
        }
        cx.scratch().insert(TX_ID_KEY, tx.id());
        self.started = Some(Instant::now());
        self.tx = Some(tx);
        Ok(())
    }

    async fn after(
        &mut self,
        marker: &Transactable,
        cx: &mut InvocationContext<'_>,
        _result: Option<&ReturnValue>,
    ) -> Result<(), BoxError> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        if !self.owns {
            return Ok(());
        }

        if cx.is_errored() {
            let discarded = self.ledger.rollback(&tx);
            info!(discarded, "transaction rolled back");
            return Ok(());
        }

        let elapsed_ms = self.started.map(|s| s.elapsed().as_millis()).unwrap_or_default();
        if elapsed_ms > u128::from(marker.timeout_ms) {
            let discarded = self.ledger.rollback(&tx);
            warn!(discarded, elapsed_ms, "transaction timed out");
            return Err(LedgerError::TimedOut {
                elapsed_ms,
                timeout_ms: marker.timeout_ms,
            }
            .into());
        }

        let applied = self.ledger.commit(&tx)?;
        info!(applied, "transaction committed");
        Ok(())
    }
}

#[derive(Default)]
pub struct LoggingInterceptor {
    started: Option<Instant>,
}

#[async_trait]
impl Interceptor<Logged> for LoggingInterceptor {
    async fn before(&mut self, _marker: &Logged, cx: &mut InvocationContext<'_>) -> Result<(), BoxError> {
        info!(
            invocation = %cx.invocation_id(),
            method = %cx.method(),
            arguments = cx.arguments().len(),
            "call started"
        );
        self.started = Some(Instant::now());
        Ok(())
    }

    async fn after(
        &mut self,
        _marker: &Logged,
        cx: &mut InvocationContext<'_>,
        result: Option<&ReturnValue>,
    ) -> Result<(), BoxError> {
        let elapsed_us = self.started.map(|s| s.elapsed().as_micros()).unwrap_or_default();
        let tx = cx.scratch().get::<Option<Uuid>>(TX_ID_KEY).and_then(|id| *id);
        if cx.is_errored() {
            warn!(invocation = %cx.invocation_id(), elapsed_us, tx = ?tx, "call failed");
        } else {
            info!(
                invocation = %cx.invocation_id(),
                elapsed_us,
                tx = ?tx,
                returned = result.map(ReturnValue::type_name),
                "call finished"
            );
        }
        Ok(())
    }
}

pub struct ValidationInterceptor;

#[async_trait]
impl Interceptor<Validated> for ValidationInterceptor {
    async fn before(&mut self, marker: &Validated, cx: &mut InvocationContext<'_>) -> Result<(), BoxError> {
        for index in 0..cx.arguments().len() {
            let Ok(value) = cx.argument::<String>(index) else {
                continue;
            };
            if value.trim().is_empty() {
                return Err(HookError::BlankArgument {
                    method: cx.method().to_string(),
                    index,
                }
                .into());
            }
            if marker.normalize && value.trim() != value {
                let trimmed = value.trim().to_string();
                cx.set_argument(index, trimmed)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpose_core::app::{DispatcherBuilder, Proxy};
    use interpose_core::domain::Arguments;
    use interpose_core::impls::MethodTable;

    struct Echo;

    fn proxy(ledger: Arc<Ledger>, markers: Vec<Arc<dyn Marker>>) -> Proxy<Echo> {
        let dispatcher = DispatcherBuilder::new()
            .intercept::<Transactable, _, _>({
                let ledger = ledger.clone();
                move || TransactionInterceptor::new(ledger.clone())
            })
            .unwrap()
            .intercept::<Logged, _, _>(LoggingInterceptor::default)
            .unwrap()
            .intercept::<Validated, _, _>(|| ValidationInterceptor)
            .unwrap()
            .build()
            .unwrap();
        let mut table = MethodTable::new();
        table.declare::<Echo>("record", markers);
        Proxy::new(Echo, Arc::new(dispatcher), Arc::new(table))
    }

    fn ledger() -> Arc<Ledger> {
        Arc::new(Ledger::with_catalog(["widget"], ["alice"]))
    }

    #[tokio::test]
    async fn transaction_commits_on_success() {
        let ledger = ledger();
        let proxy = proxy(
            ledger.clone(),
            vec![Arc::new(Logged), Arc::new(Transactable::default())],
        );
        let tx = TxHandle::new();

        proxy
            .call("record", Arguments::new().with(tx.clone()), {
                let ledger = ledger.clone();
                move |_echo, args| {
                    let tx = args.get::<TxHandle>(0)?;
                    Ok(ledger.insert_sale(tx, "widget", "alice")?)
                }
            })
            .await
            .unwrap();

        assert_eq!(ledger.snapshot().len(), 1);
        assert!(!tx.is_active());
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_failure() {
        let ledger = ledger();
        let proxy = proxy(ledger.clone(), vec![Arc::new(Transactable::default())]);

        let err = proxy
            .call::<(), _>("record", Arguments::new().with(TxHandle::new()), {
                let ledger = ledger.clone();
                move |_echo, args| {
                    let tx = args.get::<TxHandle>(0)?;
                    ledger.insert_sale(tx, "widget", "alice")?;
                    Err(LedgerError::Injected("record").into())
                }
            })
            .await
            .unwrap_err();

        assert!(err.is_invocation());
        assert!(ledger.snapshot().is_empty());
    }

    #[tokio::test]
    async fn missing_handle_stops_before_the_call() {
        let proxy = proxy(ledger(), vec![Arc::new(Transactable::default())]);

        let err = proxy
            .call("record", Arguments::new(), |_echo, _args| Ok(()))
            .await
            .unwrap_err();
        assert!(err.is_hook());
        assert!(err.to_string().contains("no transaction handle"));
    }

    #[tokio::test]
    async fn validation_rejects_blank_and_trims_the_rest() {
        let proxy = proxy(ledger(), vec![Arc::new(Validated { normalize: true })]);

        let trimmed = proxy
            .call("record", Arguments::new().with("  widget ".to_string()), |_echo, args| {
                Ok(args.get::<String>(0)?.clone())
            })
            .await
            .unwrap();
        assert_eq!(trimmed, "widget");

        let err = proxy
            .call("record", Arguments::new().with("   ".to_string()), |_echo, _args| Ok(()))
            .await
            .unwrap_err();
        assert!(err.is_hook());
    }
}
