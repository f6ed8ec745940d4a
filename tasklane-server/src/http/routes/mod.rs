//! Route handlers organized by resource

pub mod health;
pub mod todos;
pub mod users;

use axum::Router;

use crate::db::Store;
use crate::state::AppState;

/// Every API route
pub fn api_router<D: Store>() -> Router<AppState<D>> {
    Router::new()
        .merge(health::router())
        .merge(todos::router())
        .merge(users::router())
}

/// Value a field is validated as; absent and `null` both read as empty.
fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// An empty string in an update body means "leave unchanged".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
