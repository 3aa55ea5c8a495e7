use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthError;
use crate::database::models::{Principal, PrincipalUpdate};
use crate::database::{DatabaseError, PrincipalStore};
use crate::types::Domain;

const MAX_USERNAME_LEN: usize = 50;
/// bcrypt only looks at the first 72 bytes
const MAX_SECRET_BYTES: usize = 72;
const DUMMY_SECRET: &str = "ledger-unknown-principal";

/// Principal accounts for both domains. Secrets are hashed here and never stored
/// or returned in plain form.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn PrincipalStore>,
    cost: u32,
    /// Checked against when the username is unknown, so both failures cost one bcrypt verify
    dummy_hash: Arc<OnceCell<String>>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn PrincipalStore>, cost: u32) -> Self {
        Self { store, cost, dummy_hash: Arc::new(OnceCell::new()) }
    }

    pub async fn find_by_username(
        &self,
        domain: Domain,
        username: &str,
    ) -> Result<Option<Principal>, DatabaseError> {
        self.store.find_by_username(domain, username.trim()).await
    }

    pub async fn find_by_id(&self, domain: Domain, id: Uuid) -> Result<Option<Principal>, DatabaseError> {
        self.store.find_by_id(domain, id).await
    }

    pub async fn list(&self, domain: Domain) -> Result<Vec<Principal>, DatabaseError> {
        self.store.list(domain).await
    }

    pub async fn create(&self, domain: Domain, username: &str, secret: &str) -> Result<Principal, DatabaseError> {
        let username = validate_username(username)?;
        validate_secret(secret)?;

        let hash = hash_secret(secret, self.cost).await?;
        let principal = self.store.insert(domain, Principal::new(username, hash)).await?;
        info!("Created {} account {}", domain, principal.username);
        Ok(principal)
    }

    pub async fn update(
        &self,
        domain: Domain,
        id: Uuid,
        username: Option<&str>,
        secret: Option<&str>,
    ) -> Result<Principal, DatabaseError> {
        let mut update = PrincipalUpdate {
            username: username.map(validate_username).transpose()?,
            password_hash: None,
        };
        if let Some(secret) = secret {
            validate_secret(secret)?;
            update.password_hash = Some(hash_secret(secret, self.cost).await?);
        }

        if update.is_empty() {
            return self
                .store
                .find_by_id(domain, id)
                .await?
                .ok_or_else(|| DatabaseError::not_found(domain.label()));
        }
        self.store.update(domain, id, update).await
    }

    pub async fn delete(&self, domain: Domain, id: Uuid) -> Result<(), DatabaseError> {
        self.store.delete(domain, id).await?;
        info!("Deleted {} account {}", domain, id);
        Ok(())
    }

    /// Look up by username and check the secret. Unknown user and wrong secret
    /// are the same error.
    pub async fn authenticate(&self, domain: Domain, username: &str, secret: &str) -> Result<Principal, AuthError> {
        let principal = self.find_by_username(domain, username).await?;

        let plain = secret.to_string();
        let stored = principal.as_ref().map(|p| p.password_hash.clone());
        let dummy = self.dummy_hash.clone();
        let cost = self.cost;
        let matches = tokio::task::spawn_blocking(move || -> Result<bool, DatabaseError> {
            match stored {
                Some(hash) => Ok(verify_secret(&plain, &hash)),
                None => {
                    let hash = dummy.get_or_try_init(|| bcrypt::hash(DUMMY_SECRET, cost))?;
                    verify_secret(&plain, hash);
                    Ok(false)
                }
            }
        })
        .await
        .map_err(|e| DatabaseError::Internal(e.to_string()))??;

        match principal {
            Some(principal) if matches => Ok(principal),
            Some(principal) => {
                debug!("Wrong secret for {} '{}'", domain, principal.username);
                Err(AuthError::InvalidCredentials)
            }
            None => {
                debug!("Login for unknown {} '{}'", domain, username.trim());
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.store.ping().await
    }
}

/// Trimmed, 1..=50 chars of letters, digits, `_`, `-` or `.`
pub fn validate_username(raw: &str) -> Result<String, DatabaseError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DatabaseError::invalid("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(DatabaseError::invalid(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(DatabaseError::invalid(
            "username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(username.to_string())
}

fn validate_secret(secret: &str) -> Result<(), DatabaseError> {
    if secret.is_empty() {
        return Err(DatabaseError::invalid("password is required"));
    }
    if secret.len() > MAX_SECRET_BYTES {
        return Err(DatabaseError::invalid(format!(
            "password must be at most {} bytes",
            MAX_SECRET_BYTES
        )));
    }
    Ok(())
}

/// One-way hash on the blocking pool
pub async fn hash_secret(plain: &str, cost: u32) -> Result<String, DatabaseError> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| DatabaseError::Internal(e.to_string()))?
        .map_err(DatabaseError::from)
}

/// Pure comparison; a malformed hash simply does not match
pub fn verify_secret(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}
