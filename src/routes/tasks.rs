use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUserId;
use crate::error::AppError;
use crate::models::{Task, TaskInput, TaskQuery};
use crate::state::AppState;

/// Retrieves the authenticated user's tasks.
///
/// Supports filtering by `status` and `priority`, plus `limit`/`offset`
/// pagination; ordering is newest first. Scoping to the caller happens in the
/// store, not here.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    auth: AuthenticatedUserId,
    query: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let tasks = state.tasks.list_tasks(auth.0, &query).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    auth: AuthenticatedUserId,
    body: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    body.validate()?;

    let task = state
        .tasks
        .create_task(Task::new(body.into_inner(), auth.0))
        .await?;
    log::debug!("created task {} for user {}", task.id, auth.0);
    Ok(HttpResponse::Created().json(task))
}

/// Fetches a single task. A task belonging to someone else reads as 404,
/// never 403 — existence is not leaked across users.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    auth: AuthenticatedUserId,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.get_task(path.into_inner(), auth.0).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Replaces a task's content. Same ownership rule as `get_task`.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    auth: AuthenticatedUserId,
    path: web::Path<Uuid>,
    body: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    body.validate()?;

    let task = state
        .tasks
        .update_task(path.into_inner(), auth.0, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task the caller owns.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    auth: AuthenticatedUserId,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    state.tasks.delete_task(id, auth.0).await?;
    log::debug!("deleted task {} for user {}", id, auth.0);
    Ok(HttpResponse::NoContent().finish())
}
