//! In-process store
//!
//! Backs `serve --in-memory` and the router tests. A transaction holds the
//! table lock for its whole lifetime, so transactions are serialized and
//! every one of them sees a consistent snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{DbError, TodoRepository, Transactional, UniqueField, UserRepository};
use crate::models::{NewTodo, NewUser, PageRequest, Todo, User};

#[derive(Debug, Clone, Default)]
struct Tables {
    // Insertion order; listing walks them newest first.
    todos: Vec<Todo>,
    users: Vec<User>,
}

impl Tables {
    /// Same guard as the `users_email_key`/`users_phone_key` constraints.
    fn check_unique(&self, user: &User) -> Result<(), DbError> {
        for other in self.users.iter().filter(|other| other.id != user.id) {
            if other.email == user.email {
                return Err(DbError::Duplicate(UniqueField::Email));
            }
            if other.phone == user.phone {
                return Err(DbError::Duplicate(UniqueField::Phone));
            }
        }
        Ok(())
    }
}

/// Store keeping every row in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_tables<T, F>(&self, tx: Option<&mut MemoryTx>, f: F) -> T
    where
        F: FnOnce(&mut Tables) -> T + Send,
    {
        match tx {
            Some(tx) => f(&mut *tx.tables),
            None => {
                let mut tables = self.tables.lock().await;
                f(&mut *tables)
            }
        }
    }
}

/// Open transaction on a [`MemoryStore`].
///
/// Keeps a copy of the tables taken at `begin`; dropping the handle
/// without committing puts that copy back.
pub struct MemoryTx {
    tables: OwnedMutexGuard<Tables>,
    snapshot: Option<Tables>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.tables = snapshot;
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn paginate<'a, T: Clone + 'a>(
    matches: impl Iterator<Item = &'a T>,
    page: PageRequest,
) -> (Vec<T>, u64) {
    let matches: Vec<&T> = matches.collect();
    let total = matches.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = matches
        .into_iter()
        .skip(offset)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    (items, total)
}

#[async_trait]
impl Transactional for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, DbError> {
        let tables = self.tables.clone().lock_owned().await;
        let snapshot = Some(tables.clone());
        Ok(MemoryTx { tables, snapshot })
    }

    async fn commit(&self, mut tx: MemoryTx) -> Result<(), DbError> {
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<(), DbError> {
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl TodoRepository for MemoryStore {
    async fn list_todos(
        &self,
        tx: Option<&mut MemoryTx>,
        page: PageRequest,
        search: &str,
    ) -> Result<(Vec<Todo>, u64), DbError> {
        let needle = search.to_lowercase();
        Ok(self
            .with_tables(tx, |t| {
                paginate(
                    t.todos.iter().rev().filter(|todo| contains_ci(&todo.title, &needle)),
                    page,
                )
            })
            .await)
    }

    async fn create_todo(&self, tx: Option<&mut MemoryTx>, todo: NewTodo) -> Result<Todo, DbError> {
        let created = Todo {
            id: Uuid::new_v4(),
            title: todo.title,
            status: todo.status,
            created_at: Utc::now(),
            updated_at: None,
        };
        let row = created.clone();
        self.with_tables(tx, move |t| t.todos.push(row)).await;
        Ok(created)
    }

    async fn get_todo(&self, tx: Option<&mut MemoryTx>, id: Uuid) -> Result<Option<Todo>, DbError> {
        Ok(self
            .with_tables(tx, |t| t.todos.iter().find(|todo| todo.id == id).cloned())
            .await)
    }

    async fn update_todo(
        &self,
        tx: Option<&mut MemoryTx>,
        todo: &Todo,
    ) -> Result<Option<Todo>, DbError> {
        let mut updated = todo.clone();
        updated.updated_at = Some(Utc::now());
        Ok(self
            .with_tables(tx, move |t| {
                let row = t.todos.iter_mut().find(|row| row.id == updated.id)?;
                *row = updated;
                Some(row.clone())
            })
            .await)
    }

    async fn delete_todo(&self, tx: Option<&mut MemoryTx>, id: Uuid) -> Result<bool, DbError> {
        Ok(self
            .with_tables(tx, |t| {
                let before = t.todos.len();
                t.todos.retain(|todo| todo.id != id);
                t.todos.len() < before
            })
            .await)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list_users(
        &self,
        tx: Option<&mut MemoryTx>,
        page: PageRequest,
        search: &str,
    ) -> Result<(Vec<User>, u64), DbError> {
        let needle = search.to_lowercase();
        Ok(self
            .with_tables(tx, |t| {
                paginate(
                    t.users.iter().rev().filter(|user| {
                        contains_ci(&user.full_name, &needle) || contains_ci(&user.email, &needle)
                    }),
                    page,
                )
            })
            .await)
    }

    async fn create_user(&self, tx: Option<&mut MemoryTx>, user: NewUser) -> Result<User, DbError> {
        let created = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            phone: user.phone,
            gender: user.gender,
            email: user.email,
            password_hash: user.password,
            created_at: Utc::now(),
            updated_at: None,
        };
        let row = created.clone();
        self.with_tables(tx, move |t| {
            t.check_unique(&row)?;
            t.users.push(row);
            Ok::<(), DbError>(())
        })
        .await?;
        Ok(created)
    }

    async fn get_user(&self, tx: Option<&mut MemoryTx>, id: Uuid) -> Result<Option<User>, DbError> {
        Ok(self
            .with_tables(tx, |t| t.users.iter().find(|user| user.id == id).cloned())
            .await)
    }

    async fn update_user(
        &self,
        tx: Option<&mut MemoryTx>,
        user: &User,
    ) -> Result<Option<User>, DbError> {
        let mut updated = user.clone();
        updated.updated_at = Some(Utc::now());
        self.with_tables(tx, move |t| {
            if !t.users.iter().any(|row| row.id == updated.id) {
                return Ok(None);
            }
            t.check_unique(&updated)?;
            let row = t.users.iter_mut().find(|row| row.id == updated.id);
            Ok(row.map(|row| {
                *row = updated;
                row.clone()
            }))
        })
        .await
    }

    async fn delete_user(&self, tx: Option<&mut MemoryTx>, id: Uuid) -> Result<bool, DbError> {
        Ok(self
            .with_tables(tx, |t| {
                let before = t.users.len();
                t.users.retain(|user| user.id != id);
                t.users.len() < before
            })
            .await)
    }

    async fn exists_by_email(&self, tx: Option<&mut MemoryTx>, email: &str) -> Result<bool, DbError> {
        Ok(self
            .with_tables(tx, |t| t.users.iter().any(|user| user.email == email))
            .await)
    }

    async fn exists_by_phone(&self, tx: Option<&mut MemoryTx>, phone: &str) -> Result<bool, DbError> {
        Ok(self
            .with_tables(tx, |t| t.users.iter().any(|user| user.phone == phone))
            .await)
    }
}
