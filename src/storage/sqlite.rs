use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::models::{Task, User};

// --- Rows (mapped to DB) ---

#[derive(Debug, FromRow)]
struct TaskRow {
    id: String,
    owner_id: String,
    title: String,
    description: Option<String>,
    status: String,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: Uuid::parse_str(&row.id).context("tasks.id is not a uuid")?,
            owner_id: Uuid::parse_str(&row.owner_id).context("tasks.owner_id is not a uuid")?,
            title: row.title,
            description: row.description,
            status: row.status.parse().map_err(anyhow::Error::msg)?,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    hashed_refresh_token: Option<String>,
    role: String,
    is_active: bool,
    is_verified: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: Uuid::parse_str(&row.id).context("users.id is not a uuid")?,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            hashed_refresh_token: row.hashed_refresh_token,
            role: row.role.parse().map_err(anyhow::Error::msg)?,
            is_active: row.is_active,
            is_verified: row.is_verified,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_to_tasks(rows: Vec<TaskRow>) -> anyhow::Result<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

// --- Tasks ---

#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn insert(&self, task: Task) -> anyhow::Result<Task> {
        sqlx::query(
            "INSERT OR REPLACE INTO tasks
                (id, owner_id, title, description, status, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(task.owner_id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .context("insert task")?;

        Ok(task)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("select task")?;

        row.map(Task::try_from).transpose()
    }

    async fn list(&self) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks")
            .fetch_all(&self.pool)
            .await
            .context("select tasks")?;

        rows_to_tasks(rows)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE owner_id = ?")
            .bind(owner_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("select tasks by owner")?;

        rows_to_tasks(rows)
    }

    async fn update(&self, id: Uuid, task: Task) -> anyhow::Result<Option<Task>> {
        let result = sqlx::query(
            "UPDATE tasks SET
                title = ?,
                description = ?,
                status = ?,
                due_date = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(task.updated_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("update task")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(task))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("delete task")?;

        Ok(result.rows_affected() > 0)
    }
}

// --- Users ---

#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, sql: &str, key: String) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("select user")?;

        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.find_one("SELECT * FROM users WHERE id = ?", id.to_string())
            .await
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one(
            "SELECT * FROM users WHERE email = ?",
            email.trim().to_lowercase(),
        )
        .await
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.find_one(
            "SELECT * FROM users WHERE username = ?",
            username.trim().to_lowercase(),
        )
        .await
    }

    async fn insert(&self, user: User) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users
                (id, username, email, password_hash, hashed_refresh_token, role,
                 is_active, is_verified, last_login, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.hashed_refresh_token)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.is_verified)
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::debug!(error = %e, "user insert hit a unique constraint");
                Ok(false)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user")),
        }
    }

    async fn update(&self, user: User) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET
                password_hash = ?,
                hashed_refresh_token = ?,
                role = ?,
                is_active = ?,
                is_verified = ?,
                last_login = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&user.password_hash)
        .bind(&user.hashed_refresh_token)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.is_verified)
        .bind(user.last_login)
        .bind(user.updated_at)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .context("update user")?;

        Ok(result.rows_affected() > 0)
    }
}
