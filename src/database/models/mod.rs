pub mod expense;
pub mod income;
pub mod principal;
pub mod todo;

pub use expense::{Expense, ExpensePatch, NewExpense};
pub use income::{Income, IncomePatch, RecordIncome};
pub use principal::{Principal, PrincipalUpdate};
pub use todo::{NewSubtask, NewTodo, Priority, Subtask, SubtaskPatch, Todo, TodoPatch, TodoRow};

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::error::DatabaseError;
use super::order::SortKey;

/// A record that belongs to exactly one user.
///
/// `id` and `owner_id` are fixed when the entity is built from its draft and are never
/// touched by `apply`; stores rely on that to scope every statement by owner.
pub trait OwnedEntity: Clone + Send + Sync + Serialize + 'static {
    /// Creation input
    type Draft: Send + 'static;
    /// Partial update input; absent fields keep their value
    type Patch: Send + 'static;

    /// Human name used in error messages ("Expense not found")
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;

    fn from_draft(owner_id: Uuid, draft: Self::Draft) -> Result<Self, DatabaseError>;
    fn apply(&mut self, patch: Self::Patch) -> Result<(), DatabaseError>;

    fn supports_order(key: SortKey) -> bool;
    fn compare_by(&self, other: &Self, key: SortKey) -> Ordering;

    /// Whether two records of the same kind collide on a uniqueness key other than id
    fn collides_with(&self, _other: &Self) -> bool {
        false
    }

    fn conflict_message() -> String {
        format!("{} already exists", Self::KIND)
    }
}

/// Timestamp accepted from clients either as RFC 3339 or as a bare `YYYY-MM-DD`
/// (midnight UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateInput(pub DateTime<Utc>);

impl DateInput {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(ts.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Self(dt.and_utc()))
    }
}

impl<'de> Deserialize<'de> for DateInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateInput::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
    }
}

/// Distinguish an explicit `null` from an absent field in patches:
/// absent → `None`, `null` → `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

pub(crate) fn required_title(raw: &str, what: &str) -> Result<String, DatabaseError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DatabaseError::invalid(format!("{} title is required", what)));
    }
    Ok(title.to_string())
}

pub(crate) fn finite_amount(value: f64, field: &str) -> Result<f64, DatabaseError> {
    if !value.is_finite() {
        return Err(DatabaseError::invalid(format!("{} must be a finite number", field)));
    }
    Ok(value)
}

pub(crate) fn non_negative(value: f64, field: &str) -> Result<f64, DatabaseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DatabaseError::invalid(format!("{} must be zero or more", field)));
    }
    Ok(value)
}

pub(crate) fn category_or_default(raw: Option<String>) -> String {
    raw.map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "General".to_string())
}
