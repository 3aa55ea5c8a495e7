use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::database::models::{Income, OwnedEntity, RecordIncome};
use crate::database::{DatabaseError, IncomeStore, ListOrder};

/// Monthly income bookkeeping on top of the period upsert
#[derive(Clone)]
pub struct IncomeLedger {
    store: Arc<dyn IncomeStore>,
}

impl IncomeLedger {
    pub fn new(store: Arc<dyn IncomeStore>) -> Self {
        Self { store }
    }

    /// Create the record for (owner, month, year) or overwrite its amount and
    /// savings goal. An omitted savings goal resets it to 0.
    pub async fn record_income(&self, owner_id: Uuid, input: RecordIncome) -> Result<Income, DatabaseError> {
        // Validation happens before the store is touched
        let candidate = Income::from_draft(owner_id, input)?;
        let saved = self.store.upsert_period(candidate).await?;
        debug!(
            "Recorded income {} for {} ({:?}/{:?})",
            saved.id, owner_id, saved.month, saved.year
        );
        Ok(saved)
    }

    /// Most recently created record
    pub async fn latest(&self, owner_id: Uuid) -> Result<Income, DatabaseError> {
        self.store
            .list(owner_id, ListOrder::newest_first())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::not_found(Income::KIND))
    }
}
