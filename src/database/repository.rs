use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::error::DatabaseError;
use super::models::OwnedEntity;
use super::order::ListOrder;
use super::store::OwnedStore;

/// Owner-scoped CRUD over one entity kind. The owner is always the authenticated
/// caller, so another owner's record looks exactly like a missing one.
pub struct Repository<E: OwnedEntity> {
    store: Arc<dyn OwnedStore<E>>,
}

impl<E: OwnedEntity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<E: OwnedEntity> Repository<E> {
    pub fn new(store: Arc<dyn OwnedStore<E>>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner_id: Uuid, draft: E::Draft) -> Result<E, DatabaseError> {
        let entity = E::from_draft(owner_id, draft)?;
        let created = self.store.insert(entity).await?;
        debug!("Created {} {} for {}", E::KIND, created.id(), owner_id);
        Ok(created)
    }

    pub async fn list(&self, owner_id: Uuid, order: ListOrder) -> Result<Vec<E>, DatabaseError> {
        self.store.list(owner_id, order).await
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<E>, DatabaseError> {
        self.store.get(owner_id, id).await
    }

    /// Like `get` but absent is an error
    pub async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<E, DatabaseError> {
        self.get(owner_id, id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(E::KIND))
    }

    /// Partial update; fields missing from the patch keep their stored value
    pub async fn update(&self, owner_id: Uuid, id: Uuid, patch: E::Patch) -> Result<E, DatabaseError> {
        self.modify(owner_id, id, move |entity| entity.apply(patch)).await
    }

    /// Atomic read-modify-write with an arbitrary mutation
    pub async fn modify<F>(&self, owner_id: Uuid, id: Uuid, mutation: F) -> Result<E, DatabaseError>
    where
        F: FnOnce(&mut E) -> Result<(), DatabaseError> + Send + 'static,
    {
        self.store.modify(owner_id, id, Box::new(mutation)).await
    }

    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        self.store.delete(owner_id, id).await?;
        debug!("Deleted {} {} for {}", E::KIND, id, owner_id);
        Ok(())
    }

    pub async fn purge_owner(&self, owner_id: Uuid) -> Result<u64, DatabaseError> {
        self.store.purge_owner(owner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::models::{Expense, ExpensePatch, NewExpense};

    fn repo() -> (Repository<Expense>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Repository::new(store.clone()), store)
    }

    fn draft(title: &str, amount: f64) -> NewExpense {
        NewExpense { title: title.to_string(), amount, category: None, date: None }
    }

    #[tokio::test]
    async fn create_binds_owner_from_caller() {
        let (repo, store) = repo();
        let owner = store.seed_user("owner").await;
        let e = repo.create(owner, draft("books", 30.0)).await.unwrap();
        assert_eq!(e.owner_id, owner);
        assert_eq!(repo.find(owner, e.id).await.unwrap(), e);
    }

    #[tokio::test]
    async fn cross_owner_access_is_not_found() {
        let (repo, store) = repo();
        let (alice, bob) = (store.seed_user("alice").await, store.seed_user("bob").await);
        let e = repo.create(alice, draft("books", 30.0)).await.unwrap();

        assert!(matches!(repo.find(bob, e.id).await, Err(DatabaseError::NotFound(_))));
        assert!(matches!(
            repo.update(bob, e.id, ExpensePatch { amount: Some(1.0), ..Default::default() }).await,
            Err(DatabaseError::NotFound(_))
        ));
        assert!(matches!(repo.delete(bob, e.id).await, Err(DatabaseError::NotFound(_))));

        // untouched for the real owner
        assert_eq!(repo.find(alice, e.id).await.unwrap().amount, 30.0);
    }

    #[tokio::test]
    async fn list_defaults_to_newest_first() {
        let (repo, store) = repo();
        let owner = store.seed_user("owner").await;
        let first = repo.create(owner, draft("first", 1.0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.create(owner, draft("second", 2.0)).await.unwrap();

        let ids: Vec<Uuid> = repo
            .list(owner, ListOrder::default())
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn update_with_invalid_field_keeps_stored_value() {
        let (repo, store) = repo();
        let owner = store.seed_user("owner").await;
        let e = repo.create(owner, draft("books", 30.0)).await.unwrap();

        let patch = ExpensePatch { amount: Some(5.0), title: Some(" ".into()), ..Default::default() };
        assert!(matches!(repo.update(owner, e.id, patch).await, Err(DatabaseError::InvalidArgument(_))));
        assert_eq!(repo.find(owner, e.id).await.unwrap(), e);
    }
}
