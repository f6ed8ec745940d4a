//! User service

use crate::db::{DbError, UniqueField, UserRepository};
use crate::error::{AppError, AppResult};
use crate::models::user::hash_password;
use crate::models::{NewUser, Page, PageRequest, User, UserChanges};

use super::{into_page, parse_id};

const RESOURCE: &str = "User";

/// Conflict for a write that lost a uniqueness race after its probe passed.
/// `taken` is the message tail: "already exists" or "already in use".
fn duplicate_as_conflict(err: DbError, taken: &str) -> AppError {
    match err {
        DbError::Duplicate(UniqueField::Email) => AppError::conflict(format!("Email {taken}")),
        DbError::Duplicate(UniqueField::Phone) => {
            AppError::conflict(format!("Phone number {taken}"))
        }
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct UserService<R> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        tx: Option<&mut R::Tx>,
        page: PageRequest,
        search: &str,
    ) -> AppResult<Page<User>> {
        let (items, total) = self.repo.list_users(tx, page, search).await?;
        Ok(into_page(items, total, page))
    }

    /// Store a new user. `user.password` is plaintext and gets hashed here.
    pub async fn create(&self, mut tx: Option<&mut R::Tx>, mut user: NewUser) -> AppResult<User> {
        if user.is_blank() {
            return Err(AppError::bad_request("User data cannot be empty"));
        }
        if self.repo.exists_by_email(tx.as_deref_mut(), &user.email).await? {
            return Err(AppError::conflict("Email already exists"));
        }
        if self.repo.exists_by_phone(tx.as_deref_mut(), &user.phone).await? {
            return Err(AppError::conflict("Phone number already exists"));
        }

        user.password = hash_password(&user.password).map_err(AppError::internal)?;
        let created = self
            .repo
            .create_user(tx, user)
            .await
            .map_err(|e| duplicate_as_conflict(e, "already exists"))?;
        tracing::debug!(id = %created.id, "user created");
        Ok(created)
    }

    pub async fn get_by_id(&self, tx: Option<&mut R::Tx>, id: &str) -> AppResult<User> {
        let id = parse_id(id, RESOURCE)?;
        self.repo
            .get_user(tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Merge `changes` over the stored user and write it back.
    ///
    /// A new email or phone must not belong to anyone else.
    pub async fn update(
        &self,
        mut tx: Option<&mut R::Tx>,
        id: &str,
        changes: UserChanges,
    ) -> AppResult<User> {
        let mut user = self.get_by_id(tx.as_deref_mut(), id).await?;

        if let Some(email) = changes.email.as_deref().filter(|e| *e != user.email) {
            if self.repo.exists_by_email(tx.as_deref_mut(), email).await? {
                return Err(AppError::conflict("Email already in use"));
            }
        }
        if let Some(phone) = changes.phone.as_deref().filter(|p| *p != user.phone) {
            if self.repo.exists_by_phone(tx.as_deref_mut(), phone).await? {
                return Err(AppError::conflict("Phone number already in use"));
            }
        }

        changes.apply(&mut user);
        self.repo
            .update_user(tx, &user)
            .await
            .map_err(|e| duplicate_as_conflict(e, "already in use"))?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn delete(&self, mut tx: Option<&mut R::Tx>, id: &str) -> AppResult<()> {
        let user = self.get_by_id(tx.as_deref_mut(), id).await?;
        if !self.repo.delete_user(tx, user.id).await? {
            return Err(AppError::not_found("User not found"));
        }
        tracing::debug!(id = %user.id, "user deleted");
        Ok(())
    }
}
