use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use crate::types::UserRole;
use crate::entities::user;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(DbErr),
    #[error("User already exists")]
    EmailTaken,
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<DbErr> for UserError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => UserError::EmailTaken,
            _ => UserError::Database(err),
        }
    }
}

/// Public view of an account. The password hash never leaves the store
/// except through [`User::find_credentials_by_email`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A registration that passed validation; the password is still plain text
/// and must be hashed before [`User::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl CreateUser {
    pub fn validate(&self) -> Result<NewUser, UserError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| UserError::Validation("Name is required".to_string()))?;
        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| UserError::Validation("Email is required".to_string()))?;
        let password = self
            .password
            .as_deref()
            .filter(|password| !password.is_empty())
            .ok_or_else(|| UserError::Validation("Password is required".to_string()))?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(NewUser {
            name: name.to_string(),
            email,
            password: password.to_string(),
        })
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            email: model.email,
            role: model.role,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &NewUser,
        password_hash: String,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        let email = normalize_email(&data.email);
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(UserError::EmailTaken);
        }

        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(user_id),
            name: Set(data.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(UserRole::default()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        tracing::info!(user_id = %user_id, "Registered user");
        Ok(Self::from_model(model))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Looks up an account by (normalized) email, returning it with its
    /// stored password hash for verification.
    pub async fn find_credentials_by_email<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<(Self, String)>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(db)
            .await?;
        Ok(record.map(|model| {
            let hash = model.password_hash.clone();
            (Self::from_model(model), hash)
        }))
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn registration(email: &str) -> CreateUser {
        CreateUser {
            name: Some(" Ada ".to_string()),
            email: Some(email.to_string()),
            password: Some("hunter22".to_string()),
        }
    }

    #[test]
    fn validate_normalizes_and_enforces_password_length() {
        let valid = registration("  Ada@Example.COM ").validate().unwrap();
        assert_eq!(valid.name, "Ada");
        assert_eq!(valid.email, "ada@example.com");

        let short = CreateUser {
            password: Some("12345".to_string()),
            ..registration("ada@example.com")
        };
        assert!(matches!(short.validate(), Err(UserError::Validation(_))));

        let nameless = CreateUser {
            name: Some("  ".to_string()),
            ..registration("ada@example.com")
        };
        assert!(
            matches!(nameless.validate(), Err(UserError::Validation(ref msg)) if msg == "Name is required")
        );

        let missing_email = CreateUser {
            email: None,
            ..registration("")
        };
        assert!(matches!(
            missing_email.validate(),
            Err(UserError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_then_lookup_by_id_and_email() {
        let db = setup_db().await;
        let new_user = registration("ada@example.com").validate().unwrap();
        let id = Uuid::new_v4();

        let user = User::create(&db, &new_user, "hash".to_string(), id)
            .await
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, UserRole::User);

        let by_id = User::find_by_id(&db, id).await.unwrap();
        assert_eq!(by_id, Some(user.clone()));

        let (found, hash) = User::find_credentials_by_email(&db, " ADA@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, user);
        assert_eq!(hash, "hash");

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let db = setup_db().await;
        let first = registration("ada@example.com").validate().unwrap();
        User::create(&db, &first, "hash".to_string(), Uuid::new_v4())
            .await
            .unwrap();

        let second = registration("ADA@example.com").validate().unwrap();
        let err = User::create(&db, &second, "hash".to_string(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[tokio::test]
    async fn unknown_email_has_no_credentials() {
        let db = setup_db().await;
        let found = User::find_credentials_by_email(&db, "nobody@example.com")
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
