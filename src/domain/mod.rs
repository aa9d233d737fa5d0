//! Domain module for the to-do list.
//!
//! This module contains domain models, value objects, and pure list-view
//! functions. Nothing here performs I/O.

pub mod datetime_input;
pub mod list_view;
pub mod todo;
pub mod user;
pub mod value_objects;

pub use datetime_input::InvalidDateTime;
pub use list_view::{SortOrder, StatusFilter, TodoQuery};
pub use todo::{Todo, TodoStatus, UnknownStatus};
pub use user::{AccountLink, User, normalize_email};
pub use value_objects::{Timestamp, TodoId, UserId};
