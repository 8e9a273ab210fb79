//! SalesService and the marker table describing its methods.

use std::sync::Arc;

use interpose_core::domain::{Arguments, Marker};
use interpose_core::error::{BoxError, DispatchError};
use interpose_core::impls::MethodTable;
use interpose_core::app::Proxy;

use crate::error::LedgerError;
use crate::interceptors::{Logged, Transactable, Validated};
use crate::ledger::{Isolation, Ledger, Sale, TxHandle};

pub struct SalesService {
    ledger: Arc<Ledger>,
    fail: bool,
}

impl SalesService {
    pub fn new(ledger: Arc<Ledger>, fail: bool) -> Self {
        Self { ledger, fail }
    }

    pub fn create_sale(&self, product: &str, client: &str, tx: &TxHandle) -> Result<Sale, LedgerError> {
        let sale = self.ledger.insert_sale(tx, product, client)?;
        if self.fail {
            return Err(LedgerError::Injected("create_sale"));
        }
        Ok(sale)
    }

    pub async fn create_sale_async(
        &self,
        product: String,
        client: String,
        tx: TxHandle,
    ) -> Result<Sale, LedgerError> {
        tokio::task::yield_now().await;
        let sale = self.ledger.insert_sale(&tx, &product, &client)?;
        if self.fail {
            return Err(LedgerError::Injected("create_sale_async"));
        }
        Ok(sale)
    }

    pub async fn remove_last_sale_async(&self, tx: TxHandle) -> Result<(), LedgerError> {
        tokio::task::yield_now().await;
        self.ledger.remove_last_sale(&tx)
    }
}

pub fn method_table() -> MethodTable {
    let transactable = Transactable {
        isolation: Isolation::ReadCommitted,
        timeout_ms: 5_000,
    };
    let mut table = MethodTable::new();
    for method in ["create_sale", "create_sale_async"] {
        let markers: Vec<Arc<dyn Marker>> = vec![
            Arc::new(Logged),
            Arc::new(Validated { normalize: true }),
            Arc::new(transactable),
        ];
        table.declare::<SalesService>(method, markers);
    }
    table
        .mark::<SalesService, _>("remove_last_sale_async", Logged)
        .mark::<SalesService, _>(
            "remove_last_sale_async",
            Transactable {
                isolation: Isolation::Serializable,
                ..transactable
            },
        );
    table
}

/// Typed call surface over the proxy.
pub struct Sales {
    proxy: Proxy<SalesService>,
}

impl Sales {
    pub fn new(proxy: Proxy<SalesService>) -> Self {
        Self { proxy }
    }

    pub async fn create_sale(&self, product: &str, client: &str, tx: &TxHandle) -> Result<Sale, DispatchError> {
        let args = Arguments::new()
            .with(product.to_string())
            .with(client.to_string())
            .with(tx.clone());
        self.proxy
            .call("create_sale", args, |svc, args| {
                let sale = svc.create_sale(
                    args.get::<String>(0)?,
                    args.get::<String>(1)?,
                    args.get::<TxHandle>(2)?,
                )?;
                Ok(sale)
            })
            .await
    }

    pub async fn create_sale_async(
        &self,
        product: &str,
        client: &str,
        tx: &TxHandle,
    ) -> Result<Sale, DispatchError> {
        let args = Arguments::new()
            .with(product.to_string())
            .with(client.to_string())
            .with(tx.clone());
        self.proxy
            .call_async("create_sale_async", args, |svc, args| {
                let product = args.get::<String>(0).cloned();
                let client = args.get::<String>(1).cloned();
                let tx = args.get::<TxHandle>(2).cloned();
                async move {
                    let sale = svc.create_sale_async(product?, client?, tx?).await?;
                    Ok::<_, BoxError>(sale)
                }
            })
            .await
    }

    pub async fn remove_last_sale_async(&self, tx: &TxHandle) -> Result<(), DispatchError> {
        let args = Arguments::new().with(tx.clone());
        self.proxy
            .call_async_unit("remove_last_sale_async", args, |svc, args| {
                let tx = args.get::<TxHandle>(0).cloned();
                async move {
                    svc.remove_last_sale_async(tx?).await?;
                    Ok::<_, BoxError>(())
                }
            })
            .await
    }
}
