use std::{fmt::Display, future::Future};

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::{DBService, models::task::Task};
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl ModelLoaderDeps for Deployment {
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

async fn fetch_model_or_error<M, E, Fut>(
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, ApiError>
where
    E: Display + Into<ApiError>,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::debug!("{model_name} {model_id} not found");
            Err(ApiError::NotFound(format!("{model_name} not found")))
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(error.into())
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<Response, ApiError>
where
    M: Clone + Send + Sync + 'static,
    E: Display + Into<ApiError>,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_error(model_name, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

/// Ids that do not parse as a UUID cannot name a stored task, so they are
/// reported the same way as unknown ids.
pub async fn load_task_middleware<S>(
    State(deployment): State<S>,
    Path(task_id): Path<String>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    let Ok(task_id) = Uuid::parse_str(task_id.trim()) else {
        tracing::debug!(task_id = %task_id, "Rejecting malformed task id");
        return Err(ApiError::NotFound("Task not found".to_string()));
    };

    load_request_extension(
        request,
        next,
        "Task",
        task_id,
        Task::find_by_id(&deployment.db_service().pool, task_id),
    )
    .await
}

#[cfg(test)]
mod tests {
    use db::DbErr;

    use super::fetch_model_or_error;
    use crate::error::ApiError;

    #[tokio::test]
    async fn fetch_model_or_error_returns_not_found_on_missing_model() {
        let result = fetch_model_or_error::<String, DbErr, _>(
            "Task",
            uuid::Uuid::new_v4(),
            async { Ok(None) },
        )
        .await;

        assert!(matches!(result, Err(ApiError::NotFound(msg)) if msg == "Task not found"));
    }

    #[tokio::test]
    async fn fetch_model_or_error_propagates_fetch_failure() {
        let result = fetch_model_or_error::<String, DbErr, _>(
            "Task",
            uuid::Uuid::new_v4(),
            async { Err(DbErr::Custom("db unavailable".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(ApiError::Database(_))));
    }
}
