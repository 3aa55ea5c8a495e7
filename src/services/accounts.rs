use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthError, CredentialStore, TokenService};
use crate::database::models::{Expense, Income, Principal, Todo};
use crate::database::{DatabaseError, Repository};
use crate::types::Domain;

/// Account lifecycle for both domains: registration, login and the admin's
/// management of user accounts
#[derive(Clone)]
pub struct AccountService {
    credentials: CredentialStore,
    tokens: TokenService,
    expenses: Repository<Expense>,
    incomes: Repository<Income>,
    todos: Repository<Todo>,
}

impl AccountService {
    pub fn new(
        credentials: CredentialStore,
        tokens: TokenService,
        expenses: Repository<Expense>,
        incomes: Repository<Income>,
        todos: Repository<Todo>,
    ) -> Self {
        Self { credentials, tokens, expenses, incomes, todos }
    }

    /// Self-service sign-up; only ever creates end users
    pub async fn register(&self, username: &str, password: &str) -> Result<Principal, DatabaseError> {
        self.credentials.create(Domain::User, username, password).await
    }

    /// Check credentials and issue a token for `domain`
    pub async fn login(&self, domain: Domain, username: &str, password: &str) -> Result<(Principal, String), AuthError> {
        let principal = match self.credentials.authenticate(domain, username, password).await {
            Ok(principal) => principal,
            Err(AuthError::InvalidCredentials) => {
                warn!("Failed {} login for '{}'", domain, username.trim());
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };
        let token = self.tokens.issue(domain, principal.id)?;
        info!("{} '{}' logged in", domain, principal.username);
        Ok((principal, token))
    }

    pub async fn list_users(&self) -> Result<Vec<Principal>, DatabaseError> {
        self.credentials.list(Domain::User).await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Principal, DatabaseError> {
        self.credentials
            .find_by_id(Domain::User, id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(Domain::User.label()))
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Result<Principal, DatabaseError> {
        self.credentials.create(Domain::User, username, password).await
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Principal, DatabaseError> {
        self.credentials.update(Domain::User, id, username, password).await
    }

    /// Remove the account and everything it owns
    pub async fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.credentials.delete(Domain::User, id).await?;

        let (expenses, incomes, todos) = futures::try_join!(
            self.expenses.purge_owner(id),
            self.incomes.purge_owner(id),
            self.todos.purge_owner(id),
        )?;
        info!(
            "Purged user {}: {} expenses, {} incomes, {} todos",
            id, expenses, incomes, todos
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewExpense, NewTodo, OwnedEntity, RecordIncome};
    use crate::database::{IncomeStore, ListOrder, MemoryStore, OwnedStore};
    use std::sync::Arc;

    struct Fixture {
        accounts: AccountService,
        tokens: TokenService,
        expenses: Repository<Expense>,
        todos: Repository<Todo>,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenService::new("u", "a").unwrap();
        let expenses: Repository<Expense> = Repository::new(store.clone());
        let incomes: Repository<Income> = Repository::new(store.clone());
        let todos: Repository<Todo> = Repository::new(store.clone());
        let accounts = AccountService::new(
            CredentialStore::new(store.clone(), 4),
            tokens.clone(),
            expenses.clone(),
            incomes,
            todos.clone(),
        );
        Fixture { accounts, tokens, expenses, todos, store }
    }

    #[tokio::test]
    async fn login_issues_token_for_the_right_domain() {
        let f = fixture();
        let user = f.accounts.register("sam", "pw").await.unwrap();

        let (principal, token) = f.accounts.login(Domain::User, "sam", "pw").await.unwrap();
        assert_eq!(principal.id, user.id);
        assert_eq!(f.tokens.verify(Domain::User, &token).unwrap(), user.id);
        assert!(f.tokens.verify(Domain::Admin, &token).is_err());

        // users cannot log in as admins
        assert!(matches!(
            f.accounts.login(Domain::Admin, "sam", "pw").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn deleting_a_user_removes_owned_records() {
        let f = fixture();
        let user = f.accounts.register("sam", "pw").await.unwrap();
        f.expenses
            .create(user.id, NewExpense { title: "x".into(), amount: 1.0, category: None, date: None })
            .await
            .unwrap();
        f.todos
            .create(
                user.id,
                NewTodo { title: "t".into(), due_date: None, estimated_time: None, category: None, priority: None },
            )
            .await
            .unwrap();
        let income = Income::from_draft(user.id, RecordIncome { amount: 5.0, ..Default::default() }).unwrap();
        f.store.upsert_period(income).await.unwrap();

        f.accounts.delete_user(user.id).await.unwrap();

        assert!(matches!(f.accounts.get_user(user.id).await, Err(DatabaseError::NotFound(_))));
        assert!(f.expenses.list(user.id, ListOrder::default()).await.unwrap().is_empty());
        assert!(f.todos.list(user.id, ListOrder::default()).await.unwrap().is_empty());
        assert!(OwnedStore::<Income>::list(f.store.as_ref(), user.id, ListOrder::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn writes_after_delete_find_no_owner() {
        let f = fixture();
        let user = f.accounts.register("sam", "pw").await.unwrap();
        f.accounts.delete_user(user.id).await.unwrap();

        let err = f
            .expenses
            .create(user.id, NewExpense { title: "late".into(), amount: 1.0, category: None, date: None })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(ref what) if what == "Owner"));

        let income = Income::from_draft(user.id, RecordIncome { amount: 5.0, ..Default::default() }).unwrap();
        assert!(matches!(f.store.upsert_period(income).await, Err(DatabaseError::NotFound(_))));
        assert!(f.expenses.list(user.id, ListOrder::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_unknown_user_is_not_found() {
        let f = fixture();
        assert!(matches!(f.accounts.delete_user(Uuid::new_v4()).await, Err(DatabaseError::NotFound(_))));
    }
}
