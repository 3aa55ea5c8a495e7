pub mod credentials;

pub use credentials::{hash_secret, verify_secret, CredentialStore};

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::DatabaseError;
use crate::types::Domain;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Authorization header must use Bearer token format")]
    MalformedHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    Expired,

    #[error("Token was not issued for this domain")]
    WrongDomain,

    #[error("Account no longer exists")]
    UnknownPrincipal,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id
    pub sub: Uuid,
    /// Domain the token was issued for
    pub dom: Domain,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(domain: Domain, principal_id: Uuid, issued_at: DateTime<Utc>) -> Self {
        Self {
            sub: principal_id,
            dom: domain,
            iat: issued_at.timestamp(),
            exp: (issued_at + domain.token_ttl()).timestamp(),
        }
    }
}

#[derive(Clone)]
struct DomainKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl DomainKeys {
    fn from_secret(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

/// Issues and verifies HS256 tokens. Each domain signs with its own secret.
#[derive(Clone)]
pub struct TokenService {
    user: DomainKeys,
    admin: DomainKeys,
}

impl TokenService {
    pub fn new(user_secret: &str, admin_secret: &str) -> Result<Self, AuthError> {
        Ok(Self {
            user: DomainKeys::from_secret(user_secret)?,
            admin: DomainKeys::from_secret(admin_secret)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        Self::new(&config.security.user_jwt_secret, &config.security.admin_jwt_secret)
    }

    fn keys(&self, domain: Domain) -> &DomainKeys {
        match domain {
            Domain::User => &self.user,
            Domain::Admin => &self.admin,
        }
    }

    pub fn issue(&self, domain: Domain, principal_id: Uuid) -> Result<String, AuthError> {
        self.issue_at(domain, principal_id, Utc::now())
    }

    pub fn issue_at(
        &self,
        domain: Domain,
        principal_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims::new(domain, principal_id, issued_at);
        encode(&Header::new(Algorithm::HS256), &claims, &self.keys(domain).encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Principal id carried by a token valid for `domain`
    pub fn verify(&self, domain: Domain, token: &str) -> Result<Uuid, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.keys(domain).decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            },
        )?;

        if data.claims.dom != domain {
            return Err(AuthError::WrongDomain);
        }
        Ok(data.claims.sub)
    }
}
