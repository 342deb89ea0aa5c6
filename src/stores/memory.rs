//! In-memory store implementations. These back the integration suites and
//! are useful for running the binary without a database; they are not meant
//! to survive a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewClient, NewUser, OAuth2Client, Task, TaskInput, TaskQuery, User};
use crate::stores::{ClientStore, TaskStore, UserStore};

fn lock_poisoned() -> AppError {
    AppError::InternalServerError("store lock poisoned".into())
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<i32, User>>,
    next_id: AtomicI32,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }

    /// Inserts a fully-formed user, admin flags and all. Intended for test
    /// setup; the service itself only creates users through `create_user`.
    pub fn seed_user(&self, user: User) {
        self.next_id.fetch_max(user.id + 1, Ordering::SeqCst);
        if let Ok(mut users) = self.users.write() {
            users.insert(user.id, user);
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, id: i32) -> Result<User, AppError> {
        let users = self.users.read().map_err(|_| lock_poisoned())?;
        users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Record not found".into()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, AppError> {
        let users = self.users.read().map_err(|_| lock_poisoned())?;
        users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Record not found".into()))
    }

    async fn create_user(&self, input: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().map_err(|_| lock_poisoned())?;

        if users
            .values()
            .any(|u| u.username == input.username || u.email == input.email)
        {
            return Err(AppError::BadRequest(
                "Username or email already in use".into(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            username: input.username,
            email: input.email,
            hashed_password: input.hashed_password,
            two_factor_secret: input.two_factor_secret,
            is_admin: false,
            created_at: Utc::now(),
        };
        users.insert(id, user.clone());

        Ok(user)
    }

    async fn update_user_password(&self, id: i32, hashed_password: &str) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(|_| lock_poisoned())?;
        match users.get_mut(&id) {
            Some(user) => {
                user.hashed_password = hashed_password.to_string();
                Ok(())
            }
            None => Err(AppError::NotFound("User not found".into())),
        }
    }
}

#[derive(Default)]
pub struct MemoryClientStore {
    clients: RwLock<HashMap<i32, OAuth2Client>>,
    next_id: AtomicI32,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn get_client_by_client_id(&self, client_id: &str) -> Result<OAuth2Client, AppError> {
        let clients = self.clients.read().map_err(|_| lock_poisoned())?;
        clients
            .values()
            .find(|c| c.client_id == client_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Record not found".into()))
    }

    async fn create_client(&self, input: NewClient) -> Result<OAuth2Client, AppError> {
        let mut clients = self.clients.write().map_err(|_| lock_poisoned())?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let client = OAuth2Client {
            id,
            client_id: input.client_id,
            client_secret: input.client_secret,
            redirect_uri: input.redirect_uri,
            scopes: input.scopes,
            implicit_allowed: input.implicit_allowed,
            belongs_to_user: input.belongs_to_user,
            created_at: Utc::now(),
        };
        clients.insert(id, client.clone());

        Ok(client)
    }

    async fn get_client(&self, id: i32, user_id: i32) -> Result<OAuth2Client, AppError> {
        let clients = self.clients.read().map_err(|_| lock_poisoned())?;
        clients
            .get(&id)
            .filter(|c| c.belongs_to_user == user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Record not found".into()))
    }

    async fn get_clients_for_user(&self, user_id: i32) -> Result<Vec<OAuth2Client>, AppError> {
        let clients = self.clients.read().map_err(|_| lock_poisoned())?;
        let mut owned: Vec<OAuth2Client> = clients
            .values()
            .filter(|c| c.belongs_to_user == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned)
    }

    async fn delete_client(&self, id: i32, user_id: i32) -> Result<(), AppError> {
        let mut clients = self.clients.write().map_err(|_| lock_poisoned())?;
        match clients.get(&id) {
            Some(client) if client.belongs_to_user == user_id => {
                clients.remove(&id);
                Ok(())
            }
            _ => Err(AppError::NotFound("Client not found".into())),
        }
    }
}

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_task(&self, task: Task) -> Result<Task, AppError> {
        let mut tasks = self.tasks.write().map_err(|_| lock_poisoned())?;
        tasks.insert(task.id, task.clone());

        Ok(task)
    }

    async fn get_task(&self, id: Uuid, user_id: i32) -> Result<Task, AppError> {
        let tasks = self.tasks.read().map_err(|_| lock_poisoned())?;
        tasks
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Record not found".into()))
    }

    async fn list_tasks(&self, user_id: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let tasks = self.tasks.read().map_err(|_| lock_poisoned())?;
        let mut matching: Vec<Task> = tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| query.priority.map_or(true, |p| t.priority == Some(p)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map(|l| l.max(0) as usize);

        let mut page: Vec<Task> = matching.into_iter().skip(offset).collect();
        if let Some(limit) = limit {
            page.truncate(limit);
        }

        Ok(page)
    }

    async fn update_task(
        &self,
        id: Uuid,
        user_id: i32,
        input: TaskInput,
    ) -> Result<Task, AppError> {
        let mut tasks = self.tasks.write().map_err(|_| lock_poisoned())?;
        match tasks.get_mut(&id) {
            Some(task) if task.user_id == user_id => {
                task.title = input.title;
                task.description = input.description;
                task.priority = input.priority;
                task.status = input.status;
                task.due_date = input.due_date;
                task.updated_at = Utc::now();
                Ok(task.clone())
            }
            _ => Err(AppError::NotFound("Task not found".into())),
        }
    }

    async fn delete_task(&self, id: Uuid, user_id: i32) -> Result<(), AppError> {
        let mut tasks = self.tasks.write().map_err(|_| lock_poisoned())?;
        match tasks.get(&id) {
            Some(task) if task.user_id == user_id => {
                tasks.remove(&id);
                Ok(())
            }
            _ => Err(AppError::NotFound("Task not found".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskPriority, TaskStatus};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            hashed_password: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            two_factor_secret: "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP".to_string(),
        }
    }

    #[actix_rt::test]
    async fn test_user_store_round_trip() {
        let store = MemoryUserStore::new();

        let created = store.create_user(new_user("alice")).await.unwrap();
        assert_eq!(store.get_user(created.id).await.unwrap().username, "alice");
        assert_eq!(
            store.get_user_by_username("alice").await.unwrap().id,
            created.id
        );
    }

    #[actix_rt::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let result = store.create_user(new_user("alice")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[actix_rt::test]
    async fn test_password_update_persists() {
        let store = MemoryUserStore::new();
        let created = store.create_user(new_user("alice")).await.unwrap();

        store
            .update_user_password(created.id, "$2b$14$something-stronger")
            .await
            .unwrap();

        let reloaded = store.get_user(created.id).await.unwrap();
        assert_eq!(reloaded.hashed_password, "$2b$14$something-stronger");
    }

    #[actix_rt::test]
    async fn test_task_listing_filters_and_scopes_by_owner() {
        let store = MemoryTaskStore::new();

        let mine = Task::new(
            TaskInput {
                title: "mine".into(),
                description: None,
                priority: Some(TaskPriority::High),
                status: TaskStatus::Todo,
                due_date: None,
            },
            1,
        );
        let theirs = Task::new(
            TaskInput {
                title: "theirs".into(),
                description: None,
                priority: Some(TaskPriority::High),
                status: TaskStatus::Todo,
                due_date: None,
            },
            2,
        );
        store.create_task(mine.clone()).await.unwrap();
        store.create_task(theirs).await.unwrap();

        let listed = store
            .list_tasks(1, &TaskQuery::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        let filtered = store
            .list_tasks(
                1,
                &TaskQuery {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[actix_rt::test]
    async fn test_cross_user_task_access_reads_as_missing() {
        let store = MemoryTaskStore::new();
        let task = Task::new(
            TaskInput {
                title: "mine".into(),
                description: None,
                priority: None,
                status: TaskStatus::Todo,
                due_date: None,
            },
            1,
        );
        store.create_task(task.clone()).await.unwrap();

        assert!(matches!(
            store.get_task(task.id, 2).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_task(task.id, 2).await,
            Err(AppError::NotFound(_))
        ));
    }
}
