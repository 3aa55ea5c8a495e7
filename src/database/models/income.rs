use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{deserialize_some, finite_amount, OwnedEntity};
use crate::database::error::DatabaseError;
use crate::database::order::SortKey;

/// Monthly income. At most one record exists per (owner, month, year); an absent
/// month or year is part of that key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Income {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub amount: f64,
    pub savings_goal: f64,
    /// 0 = January
    pub month: Option<i16>,
    pub year: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Income {
    pub fn period(&self) -> (Option<i32>, Option<i16>) {
        (self.year, self.month)
    }

    pub fn same_period(&self, owner_id: Uuid, month: Option<i16>, year: Option<i32>) -> bool {
        self.owner_id == owner_id && self.month == month && self.year == year
    }
}

/// Input for both the upsert path and plain creation
#[derive(Debug, Clone, Default)]
pub struct RecordIncome {
    pub amount: f64,
    pub savings_goal: Option<f64>,
    pub month: Option<i16>,
    pub year: Option<i32>,
}

impl RecordIncome {
    /// Checks that must pass before the store is touched
    pub fn validate(&self) -> Result<(), DatabaseError> {
        finite_amount(self.amount, "amount")?;
        if let Some(goal) = self.savings_goal {
            finite_amount(goal, "savingsGoal")?;
        }
        validate_month(self.month)?;
        validate_year(self.year)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomePatch {
    pub amount: Option<f64>,
    pub savings_goal: Option<f64>,
    /// `Some(None)` clears the month
    #[serde(default, deserialize_with = "deserialize_some")]
    pub month: Option<Option<i16>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub year: Option<Option<i32>>,
}

fn validate_month(month: Option<i16>) -> Result<(), DatabaseError> {
    match month {
        Some(m) if !(0..=11).contains(&m) => {
            Err(DatabaseError::invalid("month must be between 0 and 11"))
        }
        _ => Ok(()),
    }
}

// Keeps clear of the -1 sentinel the period index folds absent years to
fn validate_year(year: Option<i32>) -> Result<(), DatabaseError> {
    match year {
        Some(y) if !(1..=9999).contains(&y) => {
            Err(DatabaseError::invalid("year must be between 1 and 9999"))
        }
        _ => Ok(()),
    }
}

impl OwnedEntity for Income {
    type Draft = RecordIncome;
    type Patch = IncomePatch;

    const KIND: &'static str = "Income";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(owner_id: Uuid, draft: RecordIncome) -> Result<Self, DatabaseError> {
        draft.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            amount: draft.amount,
            savings_goal: draft.savings_goal.unwrap_or(0.0),
            month: draft.month,
            year: draft.year,
            created_at: Utc::now(),
        })
    }

    fn apply(&mut self, patch: IncomePatch) -> Result<(), DatabaseError> {
        if let Some(amount) = patch.amount {
            self.amount = finite_amount(amount, "amount")?;
        }
        if let Some(goal) = patch.savings_goal {
            self.savings_goal = finite_amount(goal, "savingsGoal")?;
        }
        if let Some(month) = patch.month {
            validate_month(month)?;
            self.month = month;
        }
        if let Some(year) = patch.year {
            validate_year(year)?;
            self.year = year;
        }
        Ok(())
    }

    fn supports_order(key: SortKey) -> bool {
        matches!(key, SortKey::Created | SortKey::Period | SortKey::Amount)
    }

    fn compare_by(&self, other: &Self, key: SortKey) -> Ordering {
        match key {
            SortKey::Period => self.period().cmp(&other.period()),
            SortKey::Amount => self.amount.total_cmp(&other.amount),
            _ => self.created_at.cmp(&other.created_at),
        }
    }

    fn collides_with(&self, other: &Self) -> bool {
        other.same_period(self.owner_id, self.month, self.year)
    }

    fn conflict_message() -> String {
        "Income record for this month already exists".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savings_goal_defaults_to_zero() {
        let income = Income::from_draft(
            Uuid::new_v4(),
            RecordIncome { amount: 100.0, ..Default::default() },
        )
        .unwrap();
        assert_eq!(income.savings_goal, 0.0);
    }

    #[test]
    fn month_outside_range_is_invalid() {
        let draft = RecordIncome { amount: 1.0, month: Some(12), ..Default::default() };
        assert!(matches!(draft.validate(), Err(DatabaseError::InvalidArgument(_))));

        let mut income = Income::from_draft(Uuid::new_v4(), RecordIncome {
            amount: 1.0,
            ..Default::default()
        })
        .unwrap();
        let err = income.apply(IncomePatch { month: Some(Some(-1)), ..Default::default() });
        assert!(err.is_err());
        assert_eq!(income.month, None);
    }

    #[test]
    fn year_outside_range_is_invalid() {
        let draft = RecordIncome { amount: 1.0, year: Some(-1), ..Default::default() };
        assert!(matches!(draft.validate(), Err(DatabaseError::InvalidArgument(_))));
        let draft = RecordIncome { amount: 1.0, year: Some(10_000), ..Default::default() };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn patch_distinguishes_null_from_absent_period() {
        let mut income = Income::from_draft(Uuid::new_v4(), RecordIncome {
            amount: 1.0,
            month: Some(5),
            year: Some(2024),
            ..Default::default()
        })
        .unwrap();

        let keep: IncomePatch = serde_json::from_str(r#"{"amount": 2}"#).unwrap();
        income.apply(keep).unwrap();
        assert_eq!(income.period(), (Some(2024), Some(5)));

        let clear: IncomePatch = serde_json::from_str(r#"{"month": null, "year": null}"#).unwrap();
        income.apply(clear).unwrap();
        assert_eq!(income.period(), (None, None));
        assert_eq!(income.amount, 2.0);
    }

    #[test]
    fn collision_requires_same_owner_and_period() {
        let owner = Uuid::new_v4();
        let march = RecordIncome { amount: 1.0, month: Some(2), year: Some(2024), ..Default::default() };
        let a = Income::from_draft(owner, march.clone()).unwrap();
        let b = Income::from_draft(owner, march.clone()).unwrap();
        let other_owner = Income::from_draft(Uuid::new_v4(), march).unwrap();

        assert!(a.collides_with(&b));
        assert!(!a.collides_with(&other_owner));
    }

    #[test]
    fn period_orders_by_year_then_month() {
        let owner = Uuid::new_v4();
        let make = |month, year| {
            Income::from_draft(owner, RecordIncome {
                amount: 1.0,
                month: Some(month),
                year: Some(year),
                ..Default::default()
            })
            .unwrap()
        };
        let dec_2023 = make(11, 2023);
        let jan_2024 = make(0, 2024);
        assert_eq!(dec_2023.compare_by(&jan_2024, SortKey::Period), Ordering::Less);
    }
}
