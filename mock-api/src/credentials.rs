use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use common_auth::Principal;
use rand_core::OsRng;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 32;
const MAX_ACCOUNT_LEN: usize = 254;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Seeded when the store starts out empty. The password is the MD5 hex digest
/// of `123456`, which is what the demo client submits.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "e10adc3949ba59abbe56e057f20f883e";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential store query failed: {0}")]
    Store(String),
    #[error("account '{0}' already exists")]
    Duplicate(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("password hashing task failed: {0}")]
    Task(String),
    #[error("failed to apply migrations: {0}")]
    Migrate(#[from] MigrateError),
}

impl From<sqlx::Error> for CredentialError {
    fn from(value: sqlx::Error) -> Self {
        Self::Store(value.to_string())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CredentialRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl CredentialRecord {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_account(&self, account: &str) -> Result<Option<CredentialRecord>, CredentialError>;

    async fn insert(&self, record: CredentialRecord) -> Result<(), CredentialError>;

    async fn count(&self) -> Result<i64, CredentialError>;
}

#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    inner: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_account(&self, account: &str) -> Result<Option<CredentialRecord>, CredentialError> {
        Ok(self.inner.read().await.get(account).cloned())
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), CredentialError> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&record.email) {
            return Err(CredentialError::Duplicate(record.email));
        }
        guard.insert(record.email.clone(), record);
        Ok(())
    }

    async fn count(&self) -> Result<i64, CredentialError> {
        Ok(self.inner.read().await.len() as i64)
    }
}

/// Postgres-backed store over the `users` table (see `migrations/`).
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), CredentialError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_account(&self, account: &str) -> Result<Option<CredentialRecord>, CredentialError> {
        let row = sqlx::query_as::<_, CredentialRecord>(
            "SELECT id, username, email, password_hash FROM users WHERE email = $1",
        )
        .bind(account)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), CredentialError> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, $4)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(&record.id)
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CredentialError::Duplicate(record.email));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, CredentialError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Checks submitted credentials against the store. Every rejection looks the
/// same to the caller so responses cannot be used to probe for accounts.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    // Verified when the account is unknown so both paths cost one argon2 run.
    dummy_hash: Arc<str>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>) -> Result<Self, CredentialError> {
        let dummy_hash = hash_password(&Uuid::new_v4().simple().to_string())?;
        Ok(Self {
            store,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub async fn authenticate(
        &self,
        account: &str,
        password: &str,
    ) -> Result<Option<Principal>, CredentialError> {
        let account = account.trim();
        if !is_well_formed(account, password) {
            return Ok(None);
        }

        let record = self.store.find_by_account(account).await?;
        let stored_hash = match &record {
            Some(record) => record.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };

        let account_owned = account.to_owned();
        let password_owned = password.to_owned();
        let matched = tokio::task::spawn_blocking(move || {
            verify_credentials(&account_owned, &password_owned, &stored_hash)
        })
        .await
        .map_err(|err| CredentialError::Task(err.to_string()))?;

        Ok(match record {
            Some(record) if matched => Some(record.principal()),
            _ => None,
        })
    }

    /// Creates the default admin account when the store holds no credentials.
    pub async fn seed_default_admin(&self) -> Result<bool, CredentialError> {
        if self.store.count().await? > 0 {
            return Ok(false);
        }

        let password_hash = tokio::task::spawn_blocking(|| hash_password(DEFAULT_ADMIN_PASSWORD))
            .await
            .map_err(|err| CredentialError::Task(err.to_string()))??;

        let record = CredentialRecord {
            id: Uuid::new_v4().to_string(),
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password_hash,
        };
        match self.store.insert(record).await {
            Ok(()) => {
                info!(account = DEFAULT_ADMIN_EMAIL, "seeded default admin account");
                Ok(true)
            }
            // another instance seeded it first
            Err(CredentialError::Duplicate(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Pure predicate: true only when the input is well formed and `password`
/// matches `stored_hash`.
pub fn verify_credentials(account: &str, password: &str, stored_hash: &str) -> bool {
    if !is_well_formed(account.trim(), password) {
        return false;
    }

    match PasswordHash::new(stored_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(err) => {
            warn!(error = %err, "stored password hash is not a valid PHC string");
            false
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::Hash(err.to_string()))
}

fn is_well_formed(account: &str, password: &str) -> bool {
    let password_len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
        return false;
    }
    if account.is_empty() || account.len() > MAX_ACCOUNT_LEN {
        return false;
    }
    match account.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}
