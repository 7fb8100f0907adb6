use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    utils::{hash_password, verify_password},
    validation::{Checker, FieldError, Validate},
};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    type Raw = RegisterBody;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>> {
        let mut c = Checker::new();
        let name = c.text("name", raw.name, 2, 50);
        let email = c.email("email", raw.email);
        // Passwords are taken verbatim, so only presence and length are checked.
        let password = match raw.password {
            Some(p) if p.chars().count() < 6 => {
                c.push("password", "String must contain at least 6 character(s)");
                p
            }
            Some(p) if p.chars().count() > 100 => {
                c.push("password", "String must contain at most 100 character(s)");
                p
            }
            Some(p) => p,
            None => {
                c.push("password", "Required");
                String::new()
            }
        };
        c.finish(RegisterRequest {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    type Raw = LoginBody;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>> {
        let mut c = Checker::new();
        let email = c.email("email", raw.email);
        let password = raw.password.unwrap_or_else(|| {
            c.push("password", "Required");
            String::new()
        });
        c.finish(LoginRequest { email, password })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Runs bcrypt work off the async workers. A failed task is logged and
/// reported to the client only as `failure`.
async fn run_blocking<T, F>(work: F, failure: &'static str) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!("Password task failed: {}", e);
        AppError::Internal(failure.into())
    })
}

impl User {
    pub async fn create(pool: &PgPool, req: RegisterRequest) -> Result<Self, AppError> {
        let password = req.password;
        let password_hash = run_blocking(move || hash_password(&password), "Failed to create user")
            .await?
            .map_err(|e| {
                tracing::error!("Failed to hash password: {}", e);
                AppError::Internal("Failed to create user".into())
            })?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(&req.email)
        .bind(&password_hash)
        .fetch_one(pool)
        .await;

        match result {
            Ok(user) => {
                tracing::info!("Registered user {}", user.id);
                Ok(user)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::Conflict("A user with this email already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn verify_login(&self, password: String) -> Result<bool, AppError> {
        let hash = self.password_hash.clone();
        run_blocking(move || verify_password(&password, &hash), "Failed to log in")
            .await?
            .map_err(|e| {
                tracing::error!("Stored password hash is unreadable: {}", e);
                AppError::Internal("Failed to log in".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_checks_every_field() {
        let raw: RegisterBody =
            serde_json::from_str(r#"{"name":"A","email":"nope","password":"123"}"#).unwrap();
        let errors = RegisterRequest::validate(raw).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);
    }

    #[test]
    fn register_keeps_password_untrimmed() {
        let raw: RegisterBody = serde_json::from_str(
            r#"{"name":"Ada","email":"ADA@example.com","password":"  secret  "}"#,
        )
        .unwrap();
        let req = RegisterRequest::validate(raw).unwrap();
        assert_eq!(req.email, "ada@example.com");
        assert_eq!(req.password, "  secret  ");
    }

    #[tokio::test]
    async fn failed_password_task_hides_its_details() {
        let result = run_blocking(
            || -> bool { panic!("bcrypt worker exploded") },
            "Failed to log in",
        )
        .await;
        match result {
            Err(AppError::Internal(message)) => assert_eq!(message, "Failed to log in"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            id: Uuid::nil(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$2b$12$secret".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }
}
