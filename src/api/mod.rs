pub mod extract;

pub use extract::{ApiPath, ApiQuery, JsonBody};

use serde::Deserialize;

use crate::database::models::OwnedEntity;
use crate::database::{DatabaseError, ListOrder};

/// `?sort=<field> [asc|desc]` on list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn order<E: OwnedEntity>(&self) -> Result<ListOrder, DatabaseError> {
        match self.sort.as_deref() {
            Some(raw) => ListOrder::parse::<E>(raw),
            None => Ok(ListOrder::newest_first()),
        }
    }
}
