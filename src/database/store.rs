use async_trait::async_trait;
use uuid::Uuid;

use super::error::DatabaseError;
use super::models::{Income, OwnedEntity, Principal, PrincipalUpdate};
use super::order::ListOrder;
use crate::types::Domain;

/// In-place change to a stored entity, applied inside the store's atomic section.
/// An `Err` aborts the whole change and leaves the stored entity untouched.
pub type Mutation<E> = Box<dyn FnOnce(&mut E) -> Result<(), DatabaseError> + Send>;

/// Principal records, partitioned by domain
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_username(
        &self,
        domain: Domain,
        username: &str,
    ) -> Result<Option<Principal>, DatabaseError>;

    async fn find_by_id(&self, domain: Domain, id: Uuid) -> Result<Option<Principal>, DatabaseError>;

    async fn list(&self, domain: Domain) -> Result<Vec<Principal>, DatabaseError>;

    /// Fails with `Conflict` when the username is taken in that domain
    async fn insert(&self, domain: Domain, principal: Principal) -> Result<Principal, DatabaseError>;

    async fn update(
        &self,
        domain: Domain,
        id: Uuid,
        update: PrincipalUpdate,
    ) -> Result<Principal, DatabaseError>;

    async fn delete(&self, domain: Domain, id: Uuid) -> Result<(), DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Storage for one kind of user-owned record. Every method takes the owner and
/// matches on it; there is no way to address a record by id alone.
#[async_trait]
pub trait OwnedStore<E: OwnedEntity>: Send + Sync {
    async fn insert(&self, entity: E) -> Result<E, DatabaseError>;

    async fn list(&self, owner_id: Uuid, order: ListOrder) -> Result<Vec<E>, DatabaseError>;

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<E>, DatabaseError>;

    /// Read-modify-write of one record as a single atomic step
    async fn modify(&self, owner_id: Uuid, id: Uuid, mutation: Mutation<E>) -> Result<E, DatabaseError>;

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), DatabaseError>;

    /// Remove everything the owner has; returns the number of records removed
    async fn purge_owner(&self, owner_id: Uuid) -> Result<u64, DatabaseError>;
}

#[async_trait]
pub trait IncomeStore: OwnedStore<Income> {
    /// Atomic create-or-update keyed by (owner, month, year). On a hit the stored
    /// record keeps its id and created_at and takes the candidate's amount and
    /// savings goal.
    async fn upsert_period(&self, candidate: Income) -> Result<Income, DatabaseError>;
}
