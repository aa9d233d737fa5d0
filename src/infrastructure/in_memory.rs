//! In-memory repository implementations.
//!
//! Suitable for development and tests. State lives in `HashMap`s behind
//! `Arc<tokio::sync::RwLock<...>>`; clones share the same store.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::RwLock;

use crate::domain::{AccountLink, Todo, TodoId, User, UserId};
use crate::infrastructure::{RepositoryError, RepositoryFuture, TodoRepository, UserRepository};

// =============================================================================
// In-Memory Todo Repository
// =============================================================================

/// In-memory implementation of `TodoRepository`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTodoRepository {
    todos: Arc<RwLock<HashMap<TodoId, Todo>>>,
}

impl InMemoryTodoRepository {
    /// Creates a new empty in-memory todo repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[allow(clippy::significant_drop_tightening)]
impl TodoRepository for InMemoryTodoRepository {
    fn find_owned(&self, id: &TodoId, owner: &UserId) -> RepositoryFuture<Option<Todo>> {
        let todos = Arc::clone(&self.todos);
        let id = *id;
        let owner = *owner;
        async move {
            let guard = todos.read().await;
            Ok(guard.get(&id).filter(|todo| todo.is_owned_by(&owner)).cloned())
        }
        .boxed()
    }

    fn list_for_user(&self, owner: &UserId) -> RepositoryFuture<Vec<Todo>> {
        let todos = Arc::clone(&self.todos);
        let owner = *owner;
        async move {
            let guard = todos.read().await;
            let mut owned: Vec<Todo> = guard
                .values()
                .filter(|todo| todo.is_owned_by(&owner))
                .cloned()
                .collect();
            owned.sort_by(|left, right| {
                right
                    .created_at
                    .cmp(&left.created_at)
                    .then_with(|| right.todo_id.cmp(&left.todo_id))
            });
            Ok(owned)
        }
        .boxed()
    }

    fn insert(&self, todo: &Todo) -> RepositoryFuture<()> {
        let todos = Arc::clone(&self.todos);
        let todo = todo.clone();
        async move {
            let mut guard = todos.write().await;
            if guard.contains_key(&todo.todo_id) {
                return Err(RepositoryError::Conflict(format!(
                    "Todo {} already exists",
                    todo.todo_id
                )));
            }
            guard.insert(todo.todo_id, todo);
            Ok(())
        }
        .boxed()
    }

    fn update_owned(&self, todo: &Todo) -> RepositoryFuture<bool> {
        let todos = Arc::clone(&self.todos);
        let mut todo = todo.clone();
        async move {
            let mut guard = todos.write().await;
            match guard.get_mut(&todo.todo_id) {
                Some(stored) if stored.is_owned_by(&todo.user_id) => {
                    // Creation time is immutable.
                    todo.created_at = stored.created_at;
                    *stored = todo;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
        .boxed()
    }

    fn delete_owned(&self, id: &TodoId, owner: &UserId) -> RepositoryFuture<bool> {
        let todos = Arc::clone(&self.todos);
        let id = *id;
        let owner = *owner;
        async move {
            let mut guard = todos.write().await;
            let owned = guard.get(&id).is_some_and(|todo| todo.is_owned_by(&owner));
            if owned {
                guard.remove(&id);
            }
            Ok(owned)
        }
        .boxed()
    }
}

// =============================================================================
// In-Memory User Repository
// =============================================================================

#[derive(Debug, Default)]
struct UserStore {
    users: HashMap<UserId, User>,
    /// `(provider, provider_account_id)` to user.
    accounts: HashMap<(String, String), UserId>,
}

/// In-memory implementation of `UserRepository`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    store: Arc<RwLock<UserStore>>,
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory user repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[allow(clippy::significant_drop_tightening)]
impl UserRepository for InMemoryUserRepository {
    fn find_by_id(&self, id: &UserId) -> RepositoryFuture<Option<User>> {
        let store = Arc::clone(&self.store);
        let id = *id;
        async move {
            let guard = store.read().await;
            Ok(guard.users.get(&id).cloned())
        }
        .boxed()
    }

    fn find_by_email(&self, email: &str) -> RepositoryFuture<Option<User>> {
        let store = Arc::clone(&self.store);
        let email = email.to_string();
        async move {
            let guard = store.read().await;
            Ok(guard.users.values().find(|user| user.email == email).cloned())
        }
        .boxed()
    }

    fn insert(&self, user: &User) -> RepositoryFuture<()> {
        let store = Arc::clone(&self.store);
        let user = user.clone();
        async move {
            let mut guard = store.write().await;
            if guard.users.values().any(|existing| existing.email == user.email) {
                return Err(RepositoryError::Conflict(format!(
                    "Email {} is already registered",
                    user.email
                )));
            }
            if guard.users.contains_key(&user.user_id) {
                return Err(RepositoryError::Conflict(format!(
                    "User {} already exists",
                    user.user_id
                )));
            }
            guard.users.insert(user.user_id, user);
            Ok(())
        }
        .boxed()
    }

    fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> RepositoryFuture<Option<User>> {
        let store = Arc::clone(&self.store);
        let key = (provider.to_string(), provider_account_id.to_string());
        async move {
            let guard = store.read().await;
            Ok(guard
                .accounts
                .get(&key)
                .and_then(|user_id| guard.users.get(user_id))
                .cloned())
        }
        .boxed()
    }

    fn link_account(&self, link: &AccountLink) -> RepositoryFuture<()> {
        let store = Arc::clone(&self.store);
        let link = link.clone();
        async move {
            let mut guard = store.write().await;
            if !guard.users.contains_key(&link.user_id) {
                return Err(RepositoryError::NotFound(format!("User {}", link.user_id)));
            }
            let key = (link.provider, link.provider_account_id);
            if guard.accounts.contains_key(&key) {
                return Err(RepositoryError::Conflict(format!(
                    "Account {}:{} is already linked",
                    key.0, key.1
                )));
            }
            guard.accounts.insert(key, link.user_id);
            Ok(())
        }
        .boxed()
    }

    fn insert_with_account(&self, user: &User, link: &AccountLink) -> RepositoryFuture<()> {
        let store = Arc::clone(&self.store);
        let user = user.clone();
        let link = link.clone();
        async move {
            let mut guard = store.write().await;
            if guard.users.values().any(|existing| existing.email == user.email) {
                return Err(RepositoryError::Conflict(format!(
                    "Email {} is already registered",
                    user.email
                )));
            }
            if guard.users.contains_key(&user.user_id) {
                return Err(RepositoryError::Conflict(format!(
                    "User {} already exists",
                    user.user_id
                )));
            }
            let key = (link.provider, link.provider_account_id);
            if guard.accounts.contains_key(&key) {
                return Err(RepositoryError::Conflict(format!(
                    "Account {}:{} is already linked",
                    key.0, key.1
                )));
            }
            guard.accounts.insert(key, user.user_id);
            guard.users.insert(user.user_id, user);
            Ok(())
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
