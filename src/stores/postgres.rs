use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewClient, NewUser, OAuth2Client, Task, TaskInput, TaskQuery, User};
use crate::stores::{ClientStore, TaskStore, UserStore};

const USER_COLUMNS: &str =
    "id, username, email, hashed_password, two_factor_secret, is_admin, created_at";

const CLIENT_COLUMNS: &str =
    "id, client_id, client_secret, redirect_uri, scopes, implicit_allowed, belongs_to_user, created_at";

const TASK_COLUMNS: &str =
    "id, title, description, priority, status, due_date, created_at, updated_at, user_id";

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_user(&self, id: i32) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, input: NewUser) -> Result<User, AppError> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, hashed_password, two_factor_secret)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.hashed_password)
        .bind(&input.two_factor_secret)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::BadRequest("Username or email already in use".into()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_user_password(&self, id: i32, hashed_password: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET hashed_password = $1 WHERE id = $2")
            .bind(hashed_password)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }

        Ok(())
    }
}

pub struct PgClientStore {
    pool: PgPool,
}

impl PgClientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    async fn get_client_by_client_id(&self, client_id: &str) -> Result<OAuth2Client, AppError> {
        let client = sqlx::query_as::<_, OAuth2Client>(&format!(
            "SELECT {} FROM oauth2_clients WHERE client_id = $1",
            CLIENT_COLUMNS
        ))
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    async fn create_client(&self, input: NewClient) -> Result<OAuth2Client, AppError> {
        let client = sqlx::query_as::<_, OAuth2Client>(&format!(
            "INSERT INTO oauth2_clients
               (client_id, client_secret, redirect_uri, scopes, implicit_allowed, belongs_to_user)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            CLIENT_COLUMNS
        ))
        .bind(&input.client_id)
        .bind(&input.client_secret)
        .bind(&input.redirect_uri)
        .bind(&input.scopes)
        .bind(input.implicit_allowed)
        .bind(input.belongs_to_user)
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    async fn get_client(&self, id: i32, user_id: i32) -> Result<OAuth2Client, AppError> {
        let client = sqlx::query_as::<_, OAuth2Client>(&format!(
            "SELECT {} FROM oauth2_clients WHERE id = $1 AND belongs_to_user = $2",
            CLIENT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    async fn get_clients_for_user(&self, user_id: i32) -> Result<Vec<OAuth2Client>, AppError> {
        let clients = sqlx::query_as::<_, OAuth2Client>(&format!(
            "SELECT {} FROM oauth2_clients WHERE belongs_to_user = $1 ORDER BY created_at DESC",
            CLIENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    async fn delete_client(&self, id: i32, user_id: i32) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM oauth2_clients WHERE id = $1 AND belongs_to_user = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Client not found".into()));
        }

        Ok(())
    }
}

pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create_task(&self, task: Task) -> Result<Task, AppError> {
        let created = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, title, description, priority, status, due_date, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(task.id)
        .bind(task.title)
        .bind(task.description)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_task(&self, id: Uuid, user_id: i32) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn list_tasks(&self, user_id: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        // Filter conditions are appended dynamically; binds follow in the
        // same order below.
        let mut sql = format!("SELECT {} FROM tasks WHERE user_id = $1", TASK_COLUMNS);
        let mut param_count = 2;

        if query.status.is_some() {
            sql.push_str(&format!(" AND status = ${}", param_count));
            param_count += 1;
        }
        if query.priority.is_some() {
            sql.push_str(&format!(" AND priority = ${}", param_count));
            param_count += 1;
        }

        sql.push_str(" ORDER BY created_at DESC");

        if query.limit.is_some() {
            sql.push_str(&format!(" LIMIT ${}", param_count));
            param_count += 1;
        }
        if query.offset.is_some() {
            sql.push_str(&format!(" OFFSET ${}", param_count));
        }

        let mut query_builder = sqlx::query_as::<_, Task>(&sql).bind(user_id);

        if let Some(status) = query.status {
            query_builder = query_builder.bind(status);
        }
        if let Some(priority) = query.priority {
            query_builder = query_builder.bind(priority);
        }
        if let Some(limit) = query.limit {
            query_builder = query_builder.bind(limit);
        }
        if let Some(offset) = query.offset {
            query_builder = query_builder.bind(offset);
        }

        let tasks = query_builder.fetch_all(&self.pool).await?;

        Ok(tasks)
    }

    async fn update_task(
        &self,
        id: Uuid,
        user_id: i32,
        input: TaskInput,
    ) -> Result<Task, AppError> {
        let updated = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET title = $1, description = $2, priority = $3, status = $4, due_date = $5,
                 updated_at = NOW()
             WHERE id = $6 AND user_id = $7
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.priority)
        .bind(input.status)
        .bind(input.due_date)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

        Ok(updated)
    }

    async fn delete_task(&self, id: Uuid, user_id: i32) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Task not found".into()));
        }

        Ok(())
    }
}
