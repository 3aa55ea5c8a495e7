use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;
use uuid::Uuid;

use super::error::DatabaseError;
use super::models::{Expense, Income, OwnedEntity, Principal, PrincipalUpdate, Todo};
use super::order::ListOrder;
use super::store::{IncomeStore, Mutation, OwnedStore, PrincipalStore};
use crate::types::Domain;

/// One table of owned records. Every write takes the table lock for the whole
/// read-check-write, which is what makes `modify` and the income upsert atomic.
pub struct MemoryTable<E> {
    rows: RwLock<HashMap<Uuid, E>>,
}

impl<E> Default for MemoryTable<E> {
    fn default() -> Self {
        Self { rows: RwLock::new(HashMap::new()) }
    }
}

impl<E: OwnedEntity> MemoryTable<E> {
    async fn insert(&self, entity: E) -> Result<E, DatabaseError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&entity.id()) || rows.values().any(|r| r.collides_with(&entity)) {
            return Err(DatabaseError::conflict(E::conflict_message()));
        }
        rows.insert(entity.id(), entity.clone());
        Ok(entity)
    }

    async fn list(&self, owner_id: Uuid, order: ListOrder) -> Vec<E> {
        let rows = self.rows.read().await;
        let mut owned: Vec<E> = rows
            .values()
            .filter(|r| r.owner_id() == owner_id)
            .cloned()
            .collect();
        order.sort(&mut owned);
        owned
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Option<E> {
        let rows = self.rows.read().await;
        rows.get(&id).filter(|r| r.owner_id() == owner_id).cloned()
    }

    async fn modify(&self, owner_id: Uuid, id: Uuid, mutation: Mutation<E>) -> Result<E, DatabaseError> {
        let mut rows = self.rows.write().await;
        let mut next = rows
            .get(&id)
            .filter(|r| r.owner_id() == owner_id)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(E::KIND))?;

        mutation(&mut next)?;

        if next.id() != id || next.owner_id() != owner_id {
            return Err(DatabaseError::Internal(format!("{} identity changed during update", E::KIND)));
        }
        if rows.values().any(|r| r.id() != id && r.collides_with(&next)) {
            return Err(DatabaseError::conflict(E::conflict_message()));
        }

        rows.insert(id, next.clone());
        Ok(next)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let mut rows = self.rows.write().await;
        match rows.get(&id) {
            Some(r) if r.owner_id() == owner_id => {
                rows.remove(&id);
                Ok(())
            }
            _ => Err(DatabaseError::not_found(E::KIND)),
        }
    }

    async fn purge_owner(&self, owner_id: Uuid) -> u64 {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, r| r.owner_id() != owner_id);
        (before - rows.len()) as u64
    }
}

impl MemoryTable<Income> {
    async fn upsert_period(&self, candidate: Income) -> Income {
        let mut rows = self.rows.write().await;
        let existing = rows
            .values_mut()
            .find(|r| r.same_period(candidate.owner_id, candidate.month, candidate.year));

        match existing {
            Some(income) => {
                income.amount = candidate.amount;
                income.savings_goal = candidate.savings_goal;
                income.clone()
            }
            None => {
                rows.insert(candidate.id, candidate.clone());
                candidate
            }
        }
    }
}

type PrincipalTables = HashMap<Domain, HashMap<Uuid, Principal>>;

/// Process-local backend used when no database is configured, and by tests.
///
/// Lock order is principals before any table. Owned inserts hold the principals
/// read lock until their row is written, so a user delete either waits for the
/// insert (and the following purge removes the row) or the insert sees the
/// owner gone.
#[derive(Default)]
pub struct MemoryStore {
    principals: RwLock<PrincipalTables>,
    expenses: MemoryTable<Expense>,
    incomes: MemoryTable<Income>,
    todos: MemoryTable<Todo>,
}

impl MemoryStore {
    pub fn new() -> Self {
        debug!("Using in-memory store");
        Self::default()
    }

    async fn lock_owner(&self, owner_id: Uuid) -> Result<RwLockReadGuard<'_, PrincipalTables>, DatabaseError> {
        let principals = self.principals.read().await;
        let exists = principals
            .get(&Domain::User)
            .is_some_and(|users| users.contains_key(&owner_id));
        if !exists {
            return Err(DatabaseError::not_found("Owner"));
        }
        Ok(principals)
    }

    #[cfg(test)]
    pub(crate) async fn seed_user(&self, username: &str) -> Uuid {
        let principal = Principal::new(username, "unused-hash");
        let id = principal.id;
        self.principals
            .write()
            .await
            .entry(Domain::User)
            .or_default()
            .insert(id, principal);
        id
    }
}

pub trait HasTable<E> {
    fn table(&self) -> &MemoryTable<E>;
}

impl HasTable<Expense> for MemoryStore {
    fn table(&self) -> &MemoryTable<Expense> {
        &self.expenses
    }
}

impl HasTable<Income> for MemoryStore {
    fn table(&self) -> &MemoryTable<Income> {
        &self.incomes
    }
}

impl HasTable<Todo> for MemoryStore {
    fn table(&self) -> &MemoryTable<Todo> {
        &self.todos
    }
}

#[async_trait]
impl<E> OwnedStore<E> for MemoryStore
where
    E: OwnedEntity,
    MemoryStore: HasTable<E>,
{
    async fn insert(&self, entity: E) -> Result<E, DatabaseError> {
        let _owner = self.lock_owner(entity.owner_id()).await?;
        HasTable::<E>::table(self).insert(entity).await
    }

    async fn list(&self, owner_id: Uuid, order: ListOrder) -> Result<Vec<E>, DatabaseError> {
        Ok(HasTable::<E>::table(self).list(owner_id, order).await)
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<E>, DatabaseError> {
        Ok(HasTable::<E>::table(self).get(owner_id, id).await)
    }

    async fn modify(&self, owner_id: Uuid, id: Uuid, mutation: Mutation<E>) -> Result<E, DatabaseError> {
        HasTable::<E>::table(self).modify(owner_id, id, mutation).await
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        HasTable::<E>::table(self).delete(owner_id, id).await
    }

    async fn purge_owner(&self, owner_id: Uuid) -> Result<u64, DatabaseError> {
        Ok(HasTable::<E>::table(self).purge_owner(owner_id).await)
    }
}

#[async_trait]
impl IncomeStore for MemoryStore {
    async fn upsert_period(&self, candidate: Income) -> Result<Income, DatabaseError> {
        let _owner = self.lock_owner(candidate.owner_id).await?;
        Ok(self.incomes.upsert_period(candidate).await)
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_by_username(
        &self,
        domain: Domain,
        username: &str,
    ) -> Result<Option<Principal>, DatabaseError> {
        let principals = self.principals.read().await;
        Ok(principals
            .get(&domain)
            .and_then(|table| table.values().find(|p| p.username == username))
            .cloned())
    }

    async fn find_by_id(&self, domain: Domain, id: Uuid) -> Result<Option<Principal>, DatabaseError> {
        let principals = self.principals.read().await;
        Ok(principals.get(&domain).and_then(|table| table.get(&id)).cloned())
    }

    async fn list(&self, domain: Domain) -> Result<Vec<Principal>, DatabaseError> {
        let principals = self.principals.read().await;
        let mut all: Vec<Principal> = principals
            .get(&domain)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.username.cmp(&b.username)));
        Ok(all)
    }

    async fn insert(&self, domain: Domain, principal: Principal) -> Result<Principal, DatabaseError> {
        let mut principals = self.principals.write().await;
        let table = principals.entry(domain).or_default();
        if table.values().any(|p| p.username == principal.username) {
            return Err(DatabaseError::conflict("Username already exists"));
        }
        table.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn update(
        &self,
        domain: Domain,
        id: Uuid,
        update: PrincipalUpdate,
    ) -> Result<Principal, DatabaseError> {
        let mut principals = self.principals.write().await;
        let table = principals.entry(domain).or_default();

        if let Some(username) = &update.username {
            if table.values().any(|p| p.id != id && &p.username == username) {
                return Err(DatabaseError::conflict("Username already exists"));
            }
        }

        let principal = table
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found(domain.label()))?;
        if let Some(username) = update.username {
            principal.username = username;
        }
        if let Some(hash) = update.password_hash {
            principal.password_hash = hash;
        }
        Ok(principal.clone())
    }

    async fn delete(&self, domain: Domain, id: Uuid) -> Result<(), DatabaseError> {
        let mut principals = self.principals.write().await;
        principals
            .get_mut(&domain)
            .and_then(|table| table.remove(&id))
            .map(|_| ())
            .ok_or_else(|| DatabaseError::not_found(domain.label()))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
