/// Shared types used across the codebase

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Authentication namespace a principal and its tokens belong to.
/// Users and admins live in separate tables and are signed with separate keys;
/// a principal of one domain is never accepted where the other is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    User,
    Admin,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::User => "user",
            Domain::Admin => "admin",
        }
    }

    /// Name used in messages ("User not found")
    pub fn label(&self) -> &'static str {
        match self {
            Domain::User => "User",
            Domain::Admin => "Admin",
        }
    }

    /// Backing table for principals of this domain
    pub fn table(&self) -> &'static str {
        match self {
            Domain::User => "users",
            Domain::Admin => "admins",
        }
    }

    /// Lifetime of a freshly issued token
    pub fn token_ttl(&self) -> Duration {
        match self {
            Domain::User => Duration::hours(24),
            Domain::Admin => Duration::hours(8),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lifetimes_differ_per_domain() {
        assert_eq!(Domain::User.token_ttl(), Duration::hours(24));
        assert_eq!(Domain::Admin.token_ttl(), Duration::hours(8));
    }

    #[test]
    fn domains_use_separate_tables() {
        assert_ne!(Domain::User.table(), Domain::Admin.table());
    }
}
