//! services/api/src/adapters/db.rs
//!
//! The PostgreSQL implementation of the `UserRepository` port, using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sage_core::domain::{Account, AuthProvider};
use sage_core::ports::{PortError, PortResult, UserRepository};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `UserRepository` port.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Creates a new `PgUserRepository`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AccountRecord {
    id: String,
    email: String,
    password_hash: Option<String>,
    provider: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl AccountRecord {
    fn to_domain(self) -> PortResult<Account> {
        let provider = self
            .provider
            .parse::<AuthProvider>()
            .map_err(PortError::Unexpected)?;
        Ok(Account {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            provider,
        })
    }
}

//=========================================================================================
// `UserRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> PortResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT id, email, password_hash, provider, created_at FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(AccountRecord::to_domain).transpose()
    }

    async fn insert(&self, account: Account) -> PortResult<Account> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "INSERT INTO accounts (id, email, password_hash, provider) VALUES ($1, $2, $3, $4) \
             RETURNING id, email, password_hash, provider, created_at",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.provider.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict("Email already exists.".to_string())
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;

        record.to_domain()
    }
}
