//! Database layer - repository contracts and their stores
//!
//! # Design Principles
//!
//! - Every repository call takes its execution context explicitly:
//!   `Some(&mut tx)` runs inside a request's transaction, `None` uses the
//!   default pool. No request-scoped ambient state.
//! - "Absent" is `Ok(None)` / `Ok(false)`, never an error, so services can
//!   tell not-found apart from an unreachable store.
//! - Uniqueness is probed before writes. A write that still trips a unique
//!   constraint (two requests racing past the probe) comes back as
//!   [`DbError::Duplicate`], never as a raw driver error.

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{NewTodo, NewUser, PageRequest, Todo, User};

pub use memory::MemoryStore;
pub use pool::{create_pool, PoolSettings};
pub use postgres::PgStore;

/// User column guarded by a unique constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Phone,
}

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("duplicate value for unique field {0:?}")]
    Duplicate(UniqueField),
}

/// Source of transaction handles.
///
/// Dropping a handle without calling [`commit`](Self::commit) rolls it back.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// In-flight transaction, owned by exactly one request
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, DbError>;

    /// Make the transaction's writes visible. On failure nothing is kept.
    async fn commit(&self, tx: Self::Tx) -> Result<(), DbError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), DbError>;
}

/// Todo persistence
#[async_trait]
pub trait TodoRepository: Transactional {
    /// One page of todos whose title contains `search` (case-insensitive),
    /// plus the number of matches across all pages.
    async fn list_todos(
        &self,
        tx: Option<&mut Self::Tx>,
        page: PageRequest,
        search: &str,
    ) -> Result<(Vec<Todo>, u64), DbError>;

    async fn create_todo(&self, tx: Option<&mut Self::Tx>, todo: NewTodo) -> Result<Todo, DbError>;

    async fn get_todo(&self, tx: Option<&mut Self::Tx>, id: Uuid) -> Result<Option<Todo>, DbError>;

    /// Write back a full (already merged) record. `None` if the row is gone.
    async fn update_todo(
        &self,
        tx: Option<&mut Self::Tx>,
        todo: &Todo,
    ) -> Result<Option<Todo>, DbError>;

    /// `false` when no row had this id.
    async fn delete_todo(&self, tx: Option<&mut Self::Tx>, id: Uuid) -> Result<bool, DbError>;
}

/// User persistence
#[async_trait]
pub trait UserRepository: Transactional {
    /// One page of users whose full name or email contains `search`
    /// (case-insensitive), plus the number of matches across all pages.
    async fn list_users(
        &self,
        tx: Option<&mut Self::Tx>,
        page: PageRequest,
        search: &str,
    ) -> Result<(Vec<User>, u64), DbError>;

    /// `user.password` must already be hashed.
    async fn create_user(&self, tx: Option<&mut Self::Tx>, user: NewUser) -> Result<User, DbError>;

    async fn get_user(&self, tx: Option<&mut Self::Tx>, id: Uuid) -> Result<Option<User>, DbError>;

    /// Write back a full (already merged) record. `None` if the row is gone.
    async fn update_user(
        &self,
        tx: Option<&mut Self::Tx>,
        user: &User,
    ) -> Result<Option<User>, DbError>;

    /// `false` when no row had this id.
    async fn delete_user(&self, tx: Option<&mut Self::Tx>, id: Uuid) -> Result<bool, DbError>;

    async fn exists_by_email(&self, tx: Option<&mut Self::Tx>, email: &str) -> Result<bool, DbError>;

    async fn exists_by_phone(&self, tx: Option<&mut Self::Tx>, phone: &str) -> Result<bool, DbError>;
}

/// Everything the HTTP layer needs from a backing store
pub trait Store: TodoRepository + UserRepository + Clone + 'static {}

impl<T> Store for T where T: TodoRepository + UserRepository + Clone + 'static {}
