//! Business rules over the repositories
//!
//! Services turn repository results into [`AppError`]s: absent rows become
//! `NotFound`, uniqueness collisions become `Conflict` and store failures
//! become `Internal`. Like the repositories, every call takes the request's
//! transaction explicitly.

pub mod todos;
pub mod users;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Page, PageRequest, PaginationMeta};

pub use todos::TodoService;
pub use users::UserService;

/// Parse a path id, reporting empty and malformed ids as bad requests.
pub(crate) fn parse_id(raw: &str, resource: &str) -> AppResult<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::bad_request(format!("{resource} ID cannot be empty")));
    }
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("{resource} ID is malformed")))
}

/// Wrap a repository listing; an empty page always reports zero meta.
pub(crate) fn into_page<T>(items: Vec<T>, total: u64, request: PageRequest) -> Page<T> {
    let meta = if items.is_empty() {
        PaginationMeta::empty(request)
    } else {
        PaginationMeta::new(request, total)
    };
    Page { items, meta }
}
