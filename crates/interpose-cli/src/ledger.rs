//! In-memory sales ledger with explicit transaction handles.
//!
//! Writes are staged on a `TxHandle` and only reach the ledger on commit.
//! The handle travels as an ordinary call argument.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use uuid::Uuid;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sale {
    pub id: Uuid,
    pub product: String,
    pub client: String,
    pub sequence: u64,
}

#[derive(Debug)]
enum Staged {
    Insert(Sale),
    RemoveLast,
}

#[derive(Debug, Default)]
struct TxState {
    id: Option<Uuid>,
    isolation: Option<Isolation>,
    staged: Vec<Staged>,
}

/// Caller-owned transaction handle. Clones share the same transaction.
#[derive(Debug, Clone, Default)]
pub struct TxHandle {
    state: Arc<Mutex<TxState>>,
}

impl TxHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a transaction unless one is already active on this handle.
    /// Returns whether a new transaction was started.
    pub fn begin(&self, isolation: Isolation) -> bool {
        let mut state = self.state.lock();
        if state.id.is_some() {
            return false;
        }
        state.id = Some(Uuid::new_v4());
        state.isolation = Some(isolation);
        true
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().id.is_some()
    }

    pub fn id(&self) -> Option<Uuid> {
        self.state.lock().id
    }

    pub fn isolation(&self) -> Option<Isolation> {
        self.state.lock().isolation
    }

    pub fn staged(&self) -> usize {
        self.state.lock().staged.len()
    }

    fn stage(&self, op: Staged) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.id.is_none() {
            return Err(LedgerError::NoTransaction);
        }
        state.staged.push(op);
        Ok(())
    }

    fn finish(&self) -> Vec<Staged> {
        std::mem::take(&mut *self.state.lock()).staged
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    products: Vec<String>,
    clients: Vec<String>,
    sales: RwLock<Vec<Sale>>,
    sequence: AtomicU64,
}

impl Ledger {
    pub fn with_catalog<P, C>(products: P, clients: C) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            products: products.into_iter().map(Into::into).collect(),
            clients: clients.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Stages a new sale on `tx`.
    pub fn insert_sale(&self, tx: &TxHandle, product: &str, client: &str) -> Result<Sale, LedgerError> {
        if !self.products.iter().any(|p| p == product) {
            return Err(LedgerError::UnknownProduct(product.to_string()));
        }
        if !self.clients.iter().any(|c| c == client) {
            return Err(LedgerError::UnknownClient(client.to_string()));
        }
        let sale = Sale {
            id: Uuid::new_v4(),
            product: product.to_string(),
            client: client.to_string(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        };
        tx.stage(Staged::Insert(sale.clone()))?;
        Ok(sale)
    }

    pub fn remove_last_sale(&self, tx: &TxHandle) -> Result<(), LedgerError> {
        tx.stage(Staged::RemoveLast)
    }

    /// Applies every staged write at once, or none of them.
    pub fn commit(&self, tx: &TxHandle) -> Result<usize, LedgerError> {
        let staged = tx.finish();
        let mut sales = self.sales.write();
        let mut next = sales.clone();
        for op in &staged {
            match op {
                Staged::Insert(sale) => next.push(sale.clone()),
                Staged::RemoveLast => {
                    let last = next
                        .iter()
                        .enumerate()
                        .max_by_key(|(_, s)| s.sequence)
                        .map(|(i, _)| i)
                        .ok_or(LedgerError::NothingToRemove)?;
                    next.remove(last);
                }
            }
        }
        *sales = next;
        Ok(staged.len())
    }

    /// Discards the staged writes. Returns how many were dropped.
    pub fn rollback(&self, tx: &TxHandle) -> usize {
        tx.finish().len()
    }

    pub fn snapshot(&self) -> Vec<Sale> {
        self.sales.read().clone()
    }
}
