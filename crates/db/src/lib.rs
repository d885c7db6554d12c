use std::time::Duration;

use db_migration::Migrator;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;

pub use sea_orm::{DatabaseConnection, DbErr};

pub mod entities;
pub mod models;
pub mod types;

const MAX_CONNECTIONS: u32 = 8;

#[derive(Clone)]
pub struct DBService {
    pub pool: DatabaseConnection,
}

impl DBService {
    /// Connects to `database_url` and brings the schema up to date.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options
            .connect_timeout(Duration::from_secs(30))
            .sqlx_logging(false);
        // sea-orm pins in-memory SQLite to a single connection.
        if !database_url.contains(":memory:") {
            options.max_connections(MAX_CONNECTIONS);
        }

        let pool = Database::connect(options).await?;
        Migrator::up(&pool, None).await?;
        tracing::debug!("Database schema is up to date");
        Ok(DBService { pool })
    }

    pub async fn close(self) -> Result<(), DbErr> {
        self.pool.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{CreateTask, Task};

    #[tokio::test]
    async fn new_runs_migrations_on_fresh_database() {
        let db = DBService::new("sqlite::memory:").await.unwrap();

        let task = Task::create(&db.pool, &CreateTask::titled("smoke"), uuid::Uuid::new_v4())
            .await
            .unwrap();
        let fetched = Task::find_by_id(&db.pool, task.id).await.unwrap();
        assert_eq!(fetched, Some(task));
    }
}
