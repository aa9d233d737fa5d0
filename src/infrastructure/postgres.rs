//! `PostgreSQL` repository implementations.
//!
//! Uses `sqlx` with a shared `PgPool`. The schema lives in
//! `migrations/0001_init.sql` and is applied by the repository factory.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE users (id UUID PRIMARY KEY, name TEXT, email TEXT UNIQUE, ...);
//! CREATE TABLE accounts (provider TEXT, provider_account_id TEXT, user_id UUID, ...);
//! CREATE TABLE todos (
//!     id UUID PRIMARY KEY,
//!     user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
//!     text TEXT NOT NULL,
//!     status TEXT NOT NULL,
//!     deadline TIMESTAMPTZ,
//!     finished_time TIMESTAMPTZ,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     CHECK ((status = 'done') = (finished_time IS NOT NULL))
//! );
//! ```

use chrono::{DateTime, Utc};
use futures::FutureExt;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::domain::{AccountLink, Timestamp, Todo, TodoId, User, UserId};
use crate::infrastructure::{RepositoryError, RepositoryFuture, TodoRepository, UserRepository};

// =============================================================================
// Error Mapping
// =============================================================================

/// Maps a `sqlx` error to a repository error.
///
/// Unique violations become `Conflict`, foreign-key violations `NotFound`.
fn map_database_error(error: &sqlx::Error) -> RepositoryError {
    match error.as_database_error() {
        Some(database_error) if database_error.is_unique_violation() => {
            RepositoryError::Conflict(database_error.message().to_string())
        }
        Some(database_error) if database_error.is_foreign_key_violation() => {
            RepositoryError::NotFound(database_error.message().to_string())
        }
        _ => RepositoryError::DatabaseError(error.to_string()),
    }
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TodoRow {
    id: Uuid,
    user_id: Uuid,
    text: String,
    deadline: Option<DateTime<Utc>>,
    finished_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Self::restore(
            TodoId::from_uuid(row.id),
            UserId::from_uuid(row.user_id),
            row.text,
            row.deadline.map(Timestamp::from_datetime),
            row.finished_time.map(Timestamp::from_datetime),
            Timestamp::from_datetime(row.created_at),
        )
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: Option<String>,
    email: String,
    password_hash: Option<String>,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let user = Self::new(
            UserId::from_uuid(row.id),
            row.email,
            Timestamp::from_datetime(row.created_at),
        )
        .with_name(row.name)
        .with_image(row.image);
        match row.password_hash {
            Some(password_hash) => user.with_password_hash(password_hash),
            None => user,
        }
    }
}

const TODO_COLUMNS: &str = "id, user_id, text, deadline, finished_time, created_at";
const USER_COLUMNS: &str = "id, name, email, password_hash, image, created_at";

// =============================================================================
// PostgreSQL Todo Repository
// =============================================================================

/// `PostgreSQL` implementation of `TodoRepository`.
#[derive(Debug, Clone)]
pub struct PostgresTodoRepository {
    pool: PgPool,
}

impl PostgresTodoRepository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TodoRepository for PostgresTodoRepository {
    fn find_owned(&self, id: &TodoId, owner: &UserId) -> RepositoryFuture<Option<Todo>> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        let owner = *owner.as_uuid();
        async move {
            let row: Option<TodoRow> = sqlx::query_as(&format!(
                "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1 AND user_id = $2"
            ))
            .bind(id)
            .bind(owner)
            .fetch_optional(&pool)
            .await
            .map_err(|error| map_database_error(&error))?;
            Ok(row.map(Todo::from))
        }
        .boxed()
    }

    fn list_for_user(&self, owner: &UserId) -> RepositoryFuture<Vec<Todo>> {
        let pool = self.pool.clone();
        let owner = *owner.as_uuid();
        async move {
            let rows: Vec<TodoRow> = sqlx::query_as(&format!(
                "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = $1 \
                 ORDER BY created_at DESC, id DESC"
            ))
            .bind(owner)
            .fetch_all(&pool)
            .await
            .map_err(|error| map_database_error(&error))?;
            Ok(rows.into_iter().map(Todo::from).collect())
        }
        .boxed()
    }

    fn insert(&self, todo: &Todo) -> RepositoryFuture<()> {
        let pool = self.pool.clone();
        let todo = todo.clone();
        async move {
            sqlx::query(
                "INSERT INTO todos (id, user_id, text, status, deadline, finished_time, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(todo.todo_id.as_uuid())
            .bind(todo.user_id.as_uuid())
            .bind(&todo.text)
            .bind(todo.status().as_str())
            .bind(todo.deadline.map(|deadline| *deadline.as_datetime()))
            .bind(todo.finished_time().map(|finished| *finished.as_datetime()))
            .bind(todo.created_at.as_datetime())
            .execute(&pool)
            .await
            .map_err(|error| map_database_error(&error))?;
            Ok(())
        }
        .boxed()
    }

    fn update_owned(&self, todo: &Todo) -> RepositoryFuture<bool> {
        let pool = self.pool.clone();
        let todo = todo.clone();
        async move {
            let result = sqlx::query(
                "UPDATE todos SET text = $3, status = $4, deadline = $5, finished_time = $6 \
                 WHERE id = $1 AND user_id = $2",
            )
            .bind(todo.todo_id.as_uuid())
            .bind(todo.user_id.as_uuid())
            .bind(&todo.text)
            .bind(todo.status().as_str())
            .bind(todo.deadline.map(|deadline| *deadline.as_datetime()))
            .bind(todo.finished_time().map(|finished| *finished.as_datetime()))
            .execute(&pool)
            .await
            .map_err(|error| map_database_error(&error))?;
            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }

    fn delete_owned(&self, id: &TodoId, owner: &UserId) -> RepositoryFuture<bool> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        let owner = *owner.as_uuid();
        async move {
            let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(owner)
                .execute(&pool)
                .await
                .map_err(|error| map_database_error(&error))?;
            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }
}

// =============================================================================
// PostgreSQL User Repository
// =============================================================================

/// `PostgreSQL` implementation of `UserRepository`.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PostgresUserRepository {
    fn find_by_id(&self, id: &UserId) -> RepositoryFuture<Option<User>> {
        let pool = self.pool.clone();
        let id = *id.as_uuid();
        async move {
            let row: Option<UserRow> =
                sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(&pool)
                    .await
                    .map_err(|error| map_database_error(&error))?;
            Ok(row.map(User::from))
        }
        .boxed()
    }

    fn find_by_email(&self, email: &str) -> RepositoryFuture<Option<User>> {
        let pool = self.pool.clone();
        let email = email.to_string();
        async move {
            let row: Option<UserRow> =
                sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                    .bind(email)
                    .fetch_optional(&pool)
                    .await
                    .map_err(|error| map_database_error(&error))?;
            Ok(row.map(User::from))
        }
        .boxed()
    }

    fn insert(&self, user: &User) -> RepositoryFuture<()> {
        let pool = self.pool.clone();
        let user = user.clone();
        async move {
            insert_user_query(&user)
                .execute(&pool)
                .await
                .map_err(|error| map_database_error(&error))?;
            Ok(())
        }
        .boxed()
    }

    fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> RepositoryFuture<Option<User>> {
        let pool = self.pool.clone();
        let provider = provider.to_string();
        let provider_account_id = provider_account_id.to_string();
        async move {
            let row: Option<UserRow> = sqlx::query_as(
                "SELECT users.id, users.name, users.email, users.password_hash, users.image, \
                 users.created_at FROM users \
                 JOIN accounts ON accounts.user_id = users.id \
                 WHERE accounts.provider = $1 AND accounts.provider_account_id = $2",
            )
            .bind(provider)
            .bind(provider_account_id)
            .fetch_optional(&pool)
            .await
            .map_err(|error| map_database_error(&error))?;
            Ok(row.map(User::from))
        }
        .boxed()
    }

    fn link_account(&self, link: &AccountLink) -> RepositoryFuture<()> {
        let pool = self.pool.clone();
        let link = link.clone();
        async move {
            insert_account_query(&link)
                .execute(&pool)
                .await
                .map_err(|error| map_database_error(&error))?;
            Ok(())
        }
        .boxed()
    }

    fn insert_with_account(&self, user: &User, link: &AccountLink) -> RepositoryFuture<()> {
        let pool = self.pool.clone();
        let user = user.clone();
        let link = link.clone();
        async move {
            let mut transaction = pool
                .begin()
                .await
                .map_err(|error| map_database_error(&error))?;
            insert_user_query(&user)
                .execute(&mut *transaction)
                .await
                .map_err(|error| map_database_error(&error))?;
            insert_account_query(&link)
                .execute(&mut *transaction)
                .await
                .map_err(|error| map_database_error(&error))?;
            transaction
                .commit()
                .await
                .map_err(|error| map_database_error(&error))?;
            Ok(())
        }
        .boxed()
    }
}

fn insert_user_query(user: &User) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, image, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(user.user_id.as_uuid())
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.image)
    .bind(user.created_at.as_datetime())
}

fn insert_account_query(link: &AccountLink) -> Query<'_, Postgres, PgArguments> {
    sqlx::query("INSERT INTO accounts (provider, provider_account_id, user_id) VALUES ($1, $2, $3)")
        .bind(&link.provider)
        .bind(&link.provider_account_id)
        .bind(link.user_id.as_uuid())
}

// =============================================================================
// Tests
// =============================================================================
