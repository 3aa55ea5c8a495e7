use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{category_or_default, finite_amount, required_title, DateInput, OwnedEntity};
use crate::database::error::DatabaseError;
use crate::database::order::SortKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    #[serde(default)]
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<DateInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<DateInput>,
}

impl OwnedEntity for Expense {
    type Draft = NewExpense;
    type Patch = ExpensePatch;

    const KIND: &'static str = "Expense";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(owner_id: Uuid, draft: NewExpense) -> Result<Self, DatabaseError> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            title: required_title(&draft.title, "Expense")?,
            amount: finite_amount(draft.amount, "amount")?,
            category: category_or_default(draft.category),
            date: draft.date.map(|d| d.0).unwrap_or(now),
            created_at: now,
        })
    }

    fn apply(&mut self, patch: ExpensePatch) -> Result<(), DatabaseError> {
        if let Some(title) = patch.title {
            self.title = required_title(&title, "Expense")?;
        }
        if let Some(amount) = patch.amount {
            self.amount = finite_amount(amount, "amount")?;
        }
        if let Some(category) = patch.category {
            self.category = category_or_default(Some(category));
        }
        if let Some(date) = patch.date {
            self.date = date.0;
        }
        Ok(())
    }

    fn supports_order(key: SortKey) -> bool {
        matches!(key, SortKey::Created | SortKey::Date | SortKey::Amount | SortKey::Title)
    }

    fn compare_by(&self, other: &Self, key: SortKey) -> Ordering {
        match key {
            SortKey::Date => self.date.cmp(&other.date),
            SortKey::Amount => self.amount.total_cmp(&other.amount),
            SortKey::Title => self.title.cmp(&other.title),
            _ => self.created_at.cmp(&other.created_at),
        }
    }
}
