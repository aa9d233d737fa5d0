//! Todo List API Library
//!
//! A personal to-do list service: users sign in with email and password or
//! with Google, then create, edit, complete and delete their own todos.
//!
//! - [`domain`]: todos, users, list filtering and sorting
//! - [`infrastructure`]: repositories, configuration, password hashing,
//!   session tokens and the OAuth provider
//! - [`api`]: axum handlers, DTOs and error responses

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod domain;
pub mod infrastructure;
