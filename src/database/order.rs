use std::cmp::Ordering;

use super::error::DatabaseError;
use super::models::OwnedEntity;
use crate::types::SortDirection;

/// Field a listing can be ordered by. Each entity kind supports a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Created,
    Date,
    DueDate,
    Amount,
    Period,
    Priority,
    Title,
}

impl SortKey {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "created" | "createdat" | "created_at" => Some(SortKey::Created),
            "date" => Some(SortKey::Date),
            "duedate" | "due_date" | "due" => Some(SortKey::DueDate),
            "amount" => Some(SortKey::Amount),
            "period" => Some(SortKey::Period),
            "priority" => Some(SortKey::Priority),
            "title" => Some(SortKey::Title),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for ListOrder {
    fn default() -> Self {
        Self::newest_first()
    }
}

impl ListOrder {
    pub fn newest_first() -> Self {
        Self { key: SortKey::Created, direction: SortDirection::Desc }
    }

    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Parse `"<field> [asc|desc]"` for entity kind `E`. Only the first comma-separated
    /// term is honoured; the direction defaults to `desc`.
    pub fn parse<E: OwnedEntity>(input: &str) -> Result<Self, DatabaseError> {
        let term = input.split(',').map(str::trim).find(|t| !t.is_empty());
        let Some(term) = term else {
            return Ok(Self::newest_first());
        };

        let mut it = term.split_whitespace();
        let column = it.next().unwrap_or_default();
        let key = SortKey::parse(column)
            .filter(|key| E::supports_order(*key))
            .ok_or_else(|| {
                DatabaseError::invalid(format!("Cannot sort {} by '{}'", E::KIND, column))
            })?;

        let direction = match it.next() {
            None => SortDirection::Desc,
            Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(dir) => {
                return Err(DatabaseError::invalid(format!("Unknown sort direction '{}'", dir)))
            }
        };

        Ok(Self { key, direction })
    }

    /// Total order used by the in-memory store: the requested key first, then newest first,
    /// then id so equal rows still come out deterministically.
    pub fn compare<E: OwnedEntity>(&self, a: &E, b: &E) -> Ordering {
        let primary = a.compare_by(b, self.key);
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary
            .then_with(|| b.created_at().cmp(&a.created_at()))
            .then_with(|| a.id().cmp(&b.id()))
    }

    pub fn sort<E: OwnedEntity>(&self, rows: &mut [E]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Expense, Todo};

    #[test]
    fn empty_input_is_newest_first() {
        assert_eq!(ListOrder::parse::<Expense>("").unwrap(), ListOrder::newest_first());
        assert_eq!(ListOrder::parse::<Expense>(" , ").unwrap(), ListOrder::newest_first());
    }

    #[test]
    fn parses_field_and_direction() {
        let order = ListOrder::parse::<Expense>("date asc").unwrap();
        assert_eq!(order, ListOrder::new(SortKey::Date, SortDirection::Asc));

        let order = ListOrder::parse::<Todo>("dueDate").unwrap();
        assert_eq!(order, ListOrder::new(SortKey::DueDate, SortDirection::Desc));
    }

    #[test]
    fn rejects_fields_the_entity_does_not_have() {
        let err = ListOrder::parse::<Todo>("amount desc").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidArgument(_)));

        let err = ListOrder::parse::<Expense>("date sideways").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidArgument(_)));
    }
}
