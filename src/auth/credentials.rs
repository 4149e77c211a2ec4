/// Credential Store
///
/// Resolves login credentials to a `Principal`. The token service only
/// depends on the trait; the bundled implementation keeps bcrypt hashes
/// in memory and is seeded from configuration.

use std::collections::HashMap;

use serde::Deserialize;

use crate::auth::claims::Principal;
use crate::auth::password::{hash_password, verify_password, DEFAULT_COST};
use crate::configuration::UserSettings;
use crate::error::{AppError, AuthError};

/// Login request body
#[derive(Deserialize, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

pub trait CredentialStore: Send + Sync {
    /// Resolve credentials to a principal
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown user or a wrong password; the two
    /// cases are indistinguishable to the caller
    fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError>;
}

struct UserRecord {
    password_hash: String,
    principal: Principal,
}

/// In-memory bcrypt-backed credential store
pub struct InMemoryCredentialStore {
    users: HashMap<String, UserRecord>,
    cost: u32,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            cost: DEFAULT_COST,
        }
    }

    /// bcrypt cost used by `with_user`
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Seed from pre-hashed configuration entries
    pub fn from_settings(users: &[UserSettings]) -> Self {
        let mut store = Self::new();
        for user in users {
            store.users.insert(
                user.username.clone(),
                UserRecord {
                    password_hash: user.password_hash.clone(),
                    principal: Principal::new(user.id, user.role.clone()),
                },
            );
        }
        store
    }

    /// Add an account from a plaintext password
    ///
    /// # Errors
    /// Returns error if bcrypt hashing fails
    pub fn with_user(
        mut self,
        username: &str,
        password: &str,
        principal: Principal,
    ) -> Result<Self, AppError> {
        let password_hash = hash_password(password, self.cost)?;
        self.users.insert(
            username.to_string(),
            UserRecord {
                password_hash,
                principal,
            },
        );
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let record = self.users.get(&credentials.username).ok_or_else(|| {
            tracing::debug!(username = %credentials.username, "Unknown username");
            AuthError::InvalidCredentials
        })?;

        if !verify_password(&credentials.password, &record.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(record.principal.clone())
    }
}
