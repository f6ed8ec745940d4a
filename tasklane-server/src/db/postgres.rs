//! PostgreSQL store
//!
//! One `PgStore` serves both repositories. Each call takes its connection
//! from the caller's transaction when given one, otherwise from the pool.

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{DbError, TodoRepository, Transactional, UniqueField, UserRepository};
use crate::models::{NewTodo, NewUser, PageRequest, Todo, User};

/// Transaction handle for [`PgStore`]
pub type PgTx = Transaction<'static, Postgres>;

const TODO_COLUMNS: &str = "id, title, status, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, full_name, phone, gender, email, password, created_at, updated_at";

/// Repository implementation backed by a sqlx pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conn<'a>(&self, tx: Option<&'a mut PgTx>) -> Result<Conn<'a>, sqlx::Error> {
        match tx {
            Some(tx) => Ok(Conn::Tx(&mut **tx)),
            None => Ok(Conn::Pooled(self.pool.acquire().await?)),
        }
    }
}

/// Either a connection borrowed from a transaction or one checked out of
/// the pool for a single call
enum Conn<'a> {
    Pooled(PoolConnection<Postgres>),
    Tx(&'a mut PgConnection),
}

impl Deref for Conn<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            Conn::Pooled(conn) => conn,
            Conn::Tx(conn) => conn,
        }
    }
}

impl DerefMut for Conn<'_> {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            Conn::Pooled(conn) => conn,
            Conn::Tx(conn) => conn,
        }
    }
}

/// ILIKE pattern matching `search` literally anywhere in the column.
fn contains_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn sql_offset(page: PageRequest) -> i64 {
    i64::try_from(page.offset()).unwrap_or(i64::MAX)
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// Unique field behind a `users_*_key` constraint name.
fn unique_field(constraint: &str) -> Option<UniqueField> {
    match constraint {
        "users_email_key" => Some(UniqueField::Email),
        "users_phone_key" => Some(UniqueField::Phone),
        _ => None,
    }
}

/// Turn a unique violation on a user column into [`DbError::Duplicate`].
fn user_write_error(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            if let Some(field) = db.constraint().and_then(unique_field) {
                return DbError::Duplicate(field);
            }
        }
    }
    DbError::Sqlx(err)
}

#[async_trait]
impl Transactional for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, DbError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: PgTx) -> Result<(), DbError> {
        // A failed COMMIT leaves nothing applied; sqlx drops the connection state.
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), DbError> {
        Ok(tx.rollback().await?)
    }
}

#[async_trait]
impl TodoRepository for PgStore {
    async fn list_todos(
        &self,
        tx: Option<&mut PgTx>,
        page: PageRequest,
        search: &str,
    ) -> Result<(Vec<Todo>, u64), DbError> {
        let mut conn = self.conn(tx).await?;
        let pattern = contains_pattern(search);

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM todos
            WHERE $1 = '' OR title ILIKE $2
            "#,
        )
        .bind(search)
        .bind(&pattern)
        .fetch_one(&mut *conn)
        .await?;

        let todos: Vec<Todo> = sqlx::query_as(&format!(
            r#"
            SELECT {TODO_COLUMNS}
            FROM todos
            WHERE $1 = '' OR title ILIKE $2
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(search)
        .bind(&pattern)
        .bind(i64::from(page.limit()))
        .bind(sql_offset(page))
        .fetch_all(&mut *conn)
        .await?;

        Ok((todos, count_to_u64(total)))
    }

    async fn create_todo(&self, tx: Option<&mut PgTx>, todo: NewTodo) -> Result<Todo, DbError> {
        let mut conn = self.conn(tx).await?;
        let created: Todo = sqlx::query_as(&format!(
            "INSERT INTO todos (title, status) VALUES ($1, $2) RETURNING {TODO_COLUMNS}"
        ))
        .bind(&todo.title)
        .bind(todo.status.as_str())
        .fetch_one(&mut *conn)
        .await?;

        Ok(created)
    }

    async fn get_todo(&self, tx: Option<&mut PgTx>, id: Uuid) -> Result<Option<Todo>, DbError> {
        let mut conn = self.conn(tx).await?;
        let todo: Option<Todo> =
            sqlx::query_as(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(todo)
    }

    async fn update_todo(&self, tx: Option<&mut PgTx>, todo: &Todo) -> Result<Option<Todo>, DbError> {
        let mut conn = self.conn(tx).await?;
        let updated: Option<Todo> = sqlx::query_as(&format!(
            r#"
            UPDATE todos
            SET title = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(todo.id)
        .bind(&todo.title)
        .bind(todo.status.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(updated)
    }

    async fn delete_todo(&self, tx: Option<&mut PgTx>, id: Uuid) -> Result<bool, DbError> {
        let mut conn = self.conn(tx).await?;
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn list_users(
        &self,
        tx: Option<&mut PgTx>,
        page: PageRequest,
        search: &str,
    ) -> Result<(Vec<User>, u64), DbError> {
        let mut conn = self.conn(tx).await?;
        let pattern = contains_pattern(search);

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE $1 = '' OR full_name ILIKE $2 OR email ILIKE $2
            "#,
        )
        .bind(search)
        .bind(&pattern)
        .fetch_one(&mut *conn)
        .await?;

        let users: Vec<User> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE $1 = '' OR full_name ILIKE $2 OR email ILIKE $2
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(search)
        .bind(&pattern)
        .bind(i64::from(page.limit()))
        .bind(sql_offset(page))
        .fetch_all(&mut *conn)
        .await?;

        Ok((users, count_to_u64(total)))
    }

    async fn create_user(&self, tx: Option<&mut PgTx>, user: NewUser) -> Result<User, DbError> {
        let mut conn = self.conn(tx).await?;
        let created: User = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (full_name, phone, gender, email, password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.gender.as_str())
        .bind(&user.email)
        .bind(&user.password)
        .fetch_one(&mut *conn)
        .await
        .map_err(user_write_error)?;

        Ok(created)
    }

    async fn get_user(&self, tx: Option<&mut PgTx>, id: Uuid) -> Result<Option<User>, DbError> {
        let mut conn = self.conn(tx).await?;
        let user: Option<User> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(user)
    }

    async fn update_user(&self, tx: Option<&mut PgTx>, user: &User) -> Result<Option<User>, DbError> {
        let mut conn = self.conn(tx).await?;
        let updated: Option<User> = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET full_name = $2, phone = $3, gender = $4, email = $5, password = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.gender.as_str())
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_optional(&mut *conn)
        .await
        .map_err(user_write_error)?;

        Ok(updated)
    }

    async fn delete_user(&self, tx: Option<&mut PgTx>, id: Uuid) -> Result<bool, DbError> {
        let mut conn = self.conn(tx).await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_email(&self, tx: Option<&mut PgTx>, email: &str) -> Result<bool, DbError> {
        let mut conn = self.conn(tx).await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count > 0)
    }

    async fn exists_by_phone(&self, tx: Option<&mut PgTx>, phone: &str) -> Result<bool, DbError> {
        let mut conn = self.conn(tx).await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count > 0)
    }
}
