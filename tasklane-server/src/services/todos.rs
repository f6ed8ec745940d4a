//! Todo service

use crate::db::TodoRepository;
use crate::error::{AppError, AppResult};
use crate::models::{NewTodo, Page, PageRequest, Todo, TodoChanges};

use super::{into_page, parse_id};

const RESOURCE: &str = "Todo";

#[derive(Clone)]
pub struct TodoService<R> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        tx: Option<&mut R::Tx>,
        page: PageRequest,
        search: &str,
    ) -> AppResult<Page<Todo>> {
        let (items, total) = self.repo.list_todos(tx, page, search).await?;
        Ok(into_page(items, total, page))
    }

    pub async fn create(&self, tx: Option<&mut R::Tx>, todo: NewTodo) -> AppResult<Todo> {
        if todo.is_blank() {
            return Err(AppError::bad_request("Todo data cannot be empty"));
        }
        let created = self.repo.create_todo(tx, todo).await?;
        tracing::debug!(id = %created.id, "todo created");
        Ok(created)
    }

    pub async fn get_by_id(&self, tx: Option<&mut R::Tx>, id: &str) -> AppResult<Todo> {
        let id = parse_id(id, RESOURCE)?;
        self.repo
            .get_todo(tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Todo not found"))
    }

    /// Merge `changes` over the stored todo and write it back.
    pub async fn update(
        &self,
        mut tx: Option<&mut R::Tx>,
        id: &str,
        changes: TodoChanges,
    ) -> AppResult<Todo> {
        let mut todo = self.get_by_id(tx.as_deref_mut(), id).await?;
        changes.apply(&mut todo);

        self.repo
            .update_todo(tx, &todo)
            .await?
            .ok_or_else(|| AppError::not_found("Todo not found"))
    }

    pub async fn delete(&self, mut tx: Option<&mut R::Tx>, id: &str) -> AppResult<()> {
        let todo = self.get_by_id(tx.as_deref_mut(), id).await?;
        if !self.repo.delete_todo(tx, todo.id).await? {
            return Err(AppError::not_found("Todo not found"));
        }
        tracing::debug!(id = %todo.id, "todo deleted");
        Ok(())
    }
}
