use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{ListTasksQuery, NewTask, StatusUpdate, TaskPatch, TaskResponse},
    services::TaskService,
};

const DEFAULT_LIMIT: usize = 100;

#[utoipa::path(
    post,
    path = "/api/users/{user_id}/tasks",
    params(
        ("user_id" = Uuid, Path, description = "Owner ID, must be the caller")
    ),
    request_body = NewTask,
    responses(
        (status = 201, description = "Task created successfully", body = TaskResponse),
        (status = 400, description = "Invalid task data"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path owner is not the caller")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(service): State<TaskService>,
    current: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<NewTask>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    current.ensure_owner(user_id)?;

    let task = service.create(user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/tasks",
    params(
        ("user_id" = Uuid, Path, description = "Owner ID, must be the caller"),
        ListTasksQuery
    ),
    responses(
        (status = 200, description = "List tasks", body = Vec<TaskResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path owner is not the caller")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn get_tasks(
    State(service): State<TaskService>,
    current: CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    current.ensure_owner(user_id)?;

    let mut tasks = service.list(user_id, params.status).await?;
    // The service gives no ordering; sort here so skip/limit pages are stable.
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let tasks = tasks
        .into_iter()
        .skip(params.skip.unwrap_or(0))
        .take(params.limit.unwrap_or(DEFAULT_LIMIT))
        .map(TaskResponse::from)
        .collect();

    Ok(Json(tasks))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/tasks/{task_id}",
    params(
        ("user_id" = Uuid, Path, description = "Owner ID, must be the caller"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Get task details", body = TaskResponse),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path owner is not the caller")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn get_task(
    State(service): State<TaskService>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TaskResponse>, AppError> {
    current.ensure_owner(user_id)?;

    let task = service.get(user_id, task_id).await?;
    Ok(Json(task.into()))
}

#[utoipa::path(
    put,
    path = "/api/users/{user_id}/tasks/{task_id}",
    params(
        ("user_id" = Uuid, Path, description = "Owner ID, must be the caller"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Invalid task data"),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path owner is not the caller")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(service): State<TaskService>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TaskPatch>,
) -> Result<Json<TaskResponse>, AppError> {
    current.ensure_owner(user_id)?;

    let task = service.update(user_id, task_id, payload).await?;
    Ok(Json(task.into()))
}

#[utoipa::path(
    delete,
    path = "/api/users/{user_id}/tasks/{task_id}",
    params(
        ("user_id" = Uuid, Path, description = "Owner ID, must be the caller"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path owner is not the caller")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(service): State<TaskService>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    current.ensure_owner(user_id)?;

    if !service.delete(user_id, task_id).await? {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/users/{user_id}/tasks/{task_id}/status",
    params(
        ("user_id" = Uuid, Path, description = "Owner ID, must be the caller"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = TaskResponse),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path owner is not the caller")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn set_task_status(
    State(service): State<TaskService>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<TaskResponse>, AppError> {
    current.ensure_owner(user_id)?;

    let task = service.set_status(user_id, task_id, payload.status).await?;
    Ok(Json(task.into()))
}

#[utoipa::path(
    patch,
    path = "/api/users/{user_id}/tasks/{task_id}/complete",
    params(
        ("user_id" = Uuid, Path, description = "Owner ID, must be the caller"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Completion toggled", body = TaskResponse),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Path owner is not the caller")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "tasks"
)]
pub async fn toggle_task_completion(
    State(service): State<TaskService>,
    current: CurrentUser,
    Path((user_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TaskResponse>, AppError> {
    current.ensure_owner(user_id)?;

    let task = service.toggle_completion(user_id, task_id).await?;
    Ok(Json(task.into()))
}
