//! Application state shared across handlers

use crate::db::Store;
use crate::services::{TodoService, UserService};

/// Shared application state.
///
/// Cloned per request; the store is a pool handle (or an `Arc`) so
/// clones are cheap.
#[derive(Clone)]
pub struct AppState<D> {
    /// Source of per-request transactions
    pub store: D,
    pub todos: TodoService<D>,
    pub users: UserService<D>,
}

impl<D: Store> AppState<D> {
    pub fn new(store: D) -> Self {
        Self {
            todos: TodoService::new(store.clone()),
            users: UserService::new(store.clone()),
            store,
        }
    }
}
