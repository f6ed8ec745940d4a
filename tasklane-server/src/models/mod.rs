//! Domain records and pagination types
//!
//! Records are plain data; validation of user input happens in
//! [`crate::validation`] before any of these are constructed.

pub mod pagination;
pub mod todo;
pub mod user;

pub use pagination::{Page, PageRequest, PaginationMeta};
pub use todo::{NewTodo, Todo, TodoChanges, TodoStatus};
pub use user::{Gender, NewUser, User, UserChanges};
