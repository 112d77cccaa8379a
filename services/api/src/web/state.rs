//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use guroosh_core::{
    ports::{AdvisoryStore, LedgerStore, NotificationStore, UserStore},
    Ledger, LedgerEntry,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub advisory: Arc<dyn AdvisoryStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires every port to the same storage adapter.
    pub fn with_store<S>(store: Arc<S>, config: Arc<Config>) -> Self
    where
        S: UserStore + AdvisoryStore + NotificationStore + LedgerStore + 'static,
    {
        Self {
            users: store.clone(),
            advisory: store.clone(),
            notifications: store.clone(),
            ledger: store,
            config,
        }
    }

    /// Typed access to one kind of ledger entry.
    pub fn ledger<T: LedgerEntry>(&self) -> Ledger<'_, T> {
        Ledger::new(self.ledger.as_ref())
    }
}
