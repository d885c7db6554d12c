use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use crate::types::{TaskPriority, TaskStatus};
use crate::{entities::task, types::allowed_values};

/// Owner recorded on tasks created without an explicit or authenticated user.
pub const ANONYMOUS_USER_ID: &str = "00000000-0000-0000-0000-000000000000";
pub const DEFAULT_ESTIMATED_MINUTES: i64 = 30;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    NotFound,
    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub estimated_minutes: i64,
    pub actual_minutes: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload. Enum fields arrive as raw strings so the store owns
/// their validation; blank values fall back to the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub user_id: Option<String>,
}

impl CreateTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<NewTask, TaskError> {
        let status = match non_blank(self.status.as_deref()) {
            Some(raw) => parse_variant("status", raw)?,
            None => TaskStatus::default(),
        };
        let priority = match non_blank(self.priority.as_deref()) {
            Some(raw) => parse_variant("priority", raw)?,
            None => TaskPriority::default(),
        };
        let estimated_minutes = match self.estimated_minutes {
            Some(minutes) => non_negative_minutes(minutes)?,
            None => DEFAULT_ESTIMATED_MINUTES,
        };
        let user_id = non_blank(self.user_id.as_deref())
            .unwrap_or(ANONYMOUS_USER_ID)
            .to_string();

        Ok(NewTask {
            title: required_title(self.title.as_deref())?,
            description: self.description.clone(),
            status,
            priority,
            estimated_minutes,
            actual_minutes: self.actual_minutes,
            start_time: self.start_time,
            end_time: self.end_time,
            color: self.color.clone(),
            category: self.category.clone(),
            user_id,
        })
    }
}

/// Partial update payload. Outer `None` leaves a field untouched. An
/// explicit JSON `null` (`Some(None)`) clears a nullable field and is a
/// validation error for a required one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub estimated_minutes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub actual_minutes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub user_id: Option<Option<String>>,
}

impl UpdateTask {
    fn validate(&self) -> Result<TaskChanges, TaskError> {
        Ok(TaskChanges {
            title: self
                .title
                .as_ref()
                .map(|title| required_title(title.as_deref()))
                .transpose()?,
            status: self
                .status
                .as_ref()
                .map(|raw| required_variant("status", raw.as_deref()))
                .transpose()?,
            priority: self
                .priority
                .as_ref()
                .map(|raw| required_variant("priority", raw.as_deref()))
                .transpose()?,
            estimated_minutes: self
                .estimated_minutes
                .map(|minutes| {
                    minutes.ok_or_else(|| {
                        TaskError::Validation("estimated_minutes cannot be null".to_string())
                    })
                })
                .transpose()?
                .map(non_negative_minutes)
                .transpose()?,
            user_id: self
                .user_id
                .as_ref()
                .map(|raw| {
                    non_blank(raw.as_deref())
                        .map(str::to_string)
                        .ok_or_else(|| TaskError::Validation("User ID is required".to_string()))
                })
                .transpose()?,
            description: self.description.clone(),
            actual_minutes: self.actual_minutes,
            start_time: self.start_time,
            end_time: self.end_time,
            color: self.color.clone(),
            category: self.category.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl TaskFilter {
    /// Returns `None` when a supplied value names no variant: no stored task
    /// can match it.
    fn criteria(&self) -> Option<(Option<TaskStatus>, Option<TaskPriority>)> {
        let status = match non_blank(self.status.as_deref()) {
            Some(raw) => Some(TaskStatus::from_str(raw).ok()?),
            None => None,
        };
        let priority = match non_blank(self.priority.as_deref()) {
            Some(raw) => Some(TaskPriority::from_str(raw).ok()?),
            None => None,
        };
        Some((status, priority))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStats {
    pub backlog: u64,
    #[serde(rename = "in-progress")]
    pub in_progress: u64,
    pub validation: u64,
    pub done: u64,
    pub total: u64,
}

impl StatusStats {
    fn from_counts(counts: impl IntoIterator<Item = (TaskStatus, i64)>) -> Self {
        let mut stats = Self::default();
        for (status, count) in counts {
            let count = u64::try_from(count).unwrap_or_default();
            match status {
                TaskStatus::Backlog => stats.backlog += count,
                TaskStatus::InProgress => stats.in_progress += count,
                TaskStatus::Validation => stats.validation += count,
                TaskStatus::Done => stats.done += count,
            }
            stats.total += count;
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityStats {
    pub urgent: u64,
    pub high: u64,
    pub normal: u64,
    pub low: u64,
    pub total: u64,
}

impl PriorityStats {
    fn from_counts(counts: impl IntoIterator<Item = (TaskPriority, i64)>) -> Self {
        let mut stats = Self::default();
        for (priority, count) in counts {
            let count = u64::try_from(count).unwrap_or_default();
            match priority {
                TaskPriority::Urgent => stats.urgent += count,
                TaskPriority::High => stats.high += count,
                TaskPriority::Normal => stats.normal += count,
                TaskPriority::Low => stats.low += count,
            }
            stats.total += count;
        }
        stats
    }
}

struct NewTask {
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    estimated_minutes: i64,
    actual_minutes: Option<i64>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    color: Option<String>,
    category: Option<String>,
    user_id: String,
}

struct TaskChanges {
    title: Option<String>,
    description: Option<Option<String>>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    estimated_minutes: Option<i64>,
    actual_minutes: Option<Option<i64>>,
    start_time: Option<Option<DateTime<Utc>>>,
    end_time: Option<Option<DateTime<Utc>>>,
    color: Option<Option<String>>,
    category: Option<Option<String>>,
    user_id: Option<String>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn required_title(raw: Option<&str>) -> Result<String, TaskError> {
    non_blank(raw)
        .map(str::to_string)
        .ok_or_else(|| TaskError::Validation("Title is required".to_string()))
}

fn parse_variant<E>(field: &str, raw: &str) -> Result<E, TaskError>
where
    E: FromStr + sea_orm::Iterable + std::fmt::Display,
{
    E::from_str(raw.trim()).map_err(|_| {
        TaskError::Validation(format!(
            "`{raw}` is not a valid {field}; expected one of: {}",
            allowed_values::<E>()
        ))
    })
}

fn required_variant<E>(field: &str, raw: Option<&str>) -> Result<E, TaskError>
where
    E: FromStr + sea_orm::Iterable + std::fmt::Display,
{
    parse_variant(field, raw.unwrap_or("null"))
}

fn non_negative_minutes(minutes: i64) -> Result<i64, TaskError> {
    if minutes < 0 {
        return Err(TaskError::Validation(
            "estimated_minutes must be zero or greater".to_string(),
        ));
    }
    Ok(minutes)
}

impl Task {
    fn from_model(model: task::Model) -> Self {
        Self {
            id: model.uuid,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            estimated_minutes: model.estimated_minutes,
            actual_minutes: model.actual_minutes,
            start_time: model.start_time,
            end_time: model.end_time,
            color: model.color,
            category: model.category,
            user_id: model.user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, DbErr> {
        let Some((status, priority)) = filter.criteria() else {
            tracing::debug!(?filter, "Task filter names an unknown variant");
            return Ok(Vec::new());
        };

        let mut query = task::Entity::find();
        if let Some(status) = status {
            query = query.filter(task::Column::Status.eq(status));
        }
        if let Some(priority) = priority {
            query = query.filter(task::Column::Priority.eq(priority));
        }

        let models = query
            .order_by_desc(task::Column::CreatedAt)
            .order_by_desc(task::Column::Id)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        let new_task = data.validate()?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            title: Set(new_task.title),
            description: Set(new_task.description),
            status: Set(new_task.status),
            priority: Set(new_task.priority),
            estimated_minutes: Set(new_task.estimated_minutes),
            actual_minutes: Set(new_task.actual_minutes),
            start_time: Set(new_task.start_time),
            end_time: Set(new_task.end_time),
            color: Set(new_task.color),
            category: Set(new_task.category),
            user_id: Set(new_task.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        tracing::debug!(task_id = %task_id, status = %model.status, "Created task");
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;
        let changes = data.validate()?;

        let mut active: task::ActiveModel = record.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(priority) = changes.priority {
            active.priority = Set(priority);
        }
        if let Some(estimated_minutes) = changes.estimated_minutes {
            active.estimated_minutes = Set(estimated_minutes);
        }
        if let Some(actual_minutes) = changes.actual_minutes {
            active.actual_minutes = Set(actual_minutes);
        }
        if let Some(start_time) = changes.start_time {
            active.start_time = Set(start_time);
        }
        if let Some(end_time) = changes.end_time {
            active.end_time = Set(end_time);
        }
        if let Some(color) = changes.color {
            active.color = Set(color);
        }
        if let Some(category) = changes.category {
            active.category = Set(category);
        }
        if let Some(user_id) = changes.user_id {
            active.user_id = Set(user_id);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), TaskError> {
        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(TaskError::NotFound);
        }
        Ok(())
    }

    pub async fn delete_all<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        let result = task::Entity::delete_many().exec(db).await?;
        tracing::info!(removed = result.rows_affected, "Cleared all tasks");
        Ok(result.rows_affected)
    }

    pub async fn count_by_status<C: ConnectionTrait>(db: &C) -> Result<StatusStats, DbErr> {
        let counts: Vec<(TaskStatus, i64)> = task::Entity::find()
            .select_only()
            .column(task::Column::Status)
            .column_as(task::Column::Id.count(), "count")
            .group_by(task::Column::Status)
            .into_tuple()
            .all(db)
            .await?;
        Ok(StatusStats::from_counts(counts))
    }

    pub async fn count_by_priority<C: ConnectionTrait>(db: &C) -> Result<PriorityStats, DbErr> {
        let counts: Vec<(TaskPriority, i64)> = task::Entity::find()
            .select_only()
            .column(task::Column::Priority)
            .column_as(task::Column::Id.count(), "count")
            .group_by(task::Column::Priority)
            .into_tuple()
            .all(db)
            .await?;
        Ok(PriorityStats::from_counts(counts))
    }
}
