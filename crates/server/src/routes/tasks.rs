use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::task::{CreateTask, PriorityStats, StatusStats, Task, TaskFilter, UpdateTask};
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{
    Deployment,
    error::ApiError,
    extract::{JsonBody, QueryParams},
    http::{auth::CurrentUser, method_not_allowed},
    middleware::load_task_middleware,
    routes::progress,
};

pub async fn get_tasks(
    State(deployment): State<Deployment>,
    QueryParams(filter): QueryParams<TaskFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success_list(tasks)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// An explicit `user_id` wins; otherwise the task belongs to the caller when
/// authenticated, and to the anonymous owner when not.
pub async fn create_task(
    State(deployment): State<Deployment>,
    CurrentUser(user): CurrentUser,
    JsonBody(mut payload): JsonBody<CreateTask>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    let id = Uuid::new_v4();

    let has_owner = payload
        .user_id
        .as_deref()
        .is_some_and(|user_id| !user_id.trim().is_empty());
    if !has_owner {
        if let Some(user) = user {
            payload.user_id = Some(user.id.to_string());
        }
    }

    tracing::debug!(
        "Creating task '{}'",
        payload.title.as_deref().unwrap_or_default()
    );

    let task = Task::create(&deployment.db().pool, &payload, id).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(task))))
}

pub async fn update_task(
    Extension(existing_task): Extension<Task>,
    State(deployment): State<Deployment>,
    JsonBody(payload): JsonBody<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::update(&deployment.db().pool, existing_task.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<serde_json::Value>>, ApiError> {
    Task::delete(&deployment.db().pool, task.id).await?;
    tracing::debug!(task_id = %task.id, "Deleted task");
    Ok(ResponseJson(ApiResponse::empty()))
}

pub async fn clear_tasks(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Task::delete_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::message(
        "All tasks deleted successfully",
    )))
}

pub async fn get_task_stats(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<StatusStats>>, ApiError> {
    let stats = Task::count_by_status(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn get_priority_stats(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<PriorityStats>>, ApiError> {
    let stats = Task::count_by_priority(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(from_fn_with_state(
            deployment.clone(),
            load_task_middleware::<Deployment>,
        ));

    let inner = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .route("/clear", delete(clear_tasks))
        .route("/stats", get(get_task_stats))
        .route("/priority-stats", get(get_priority_stats))
        .route("/progress-chart", get(progress::progress_chart))
        .method_not_allowed_fallback(method_not_allowed)
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}
