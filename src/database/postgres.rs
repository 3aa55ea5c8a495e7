use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::error::DatabaseError;
use super::manager::DatabaseManager;
use super::models::{Expense, Income, OwnedEntity, Principal, PrincipalUpdate, Todo, TodoRow};
use super::order::{ListOrder, SortKey};
use super::store::{IncomeStore, Mutation, OwnedStore, PrincipalStore};
use crate::types::{Domain, SortDirection};

/// How an owned entity maps onto its Postgres table
#[async_trait]
pub trait PgEntity: OwnedEntity {
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    const TABLE: &'static str;
    const COLUMNS: &'static str;

    fn from_row(row: Self::Row) -> Result<Self, DatabaseError>;

    /// SQL expressions that implement a sort key, most significant first
    fn order_exprs(key: SortKey) -> &'static [&'static str];

    async fn insert_into(&self, conn: &mut PgConnection) -> Result<Self, DatabaseError>;

    /// Persist every mutable column of an entity that already exists
    async fn write_back(&self, conn: &mut PgConnection) -> Result<Self, DatabaseError>;
}

fn order_clause<E: PgEntity>(order: ListOrder) -> String {
    // Matches the in-memory ordering where an absent value sorts lowest
    let nulls = match order.direction {
        SortDirection::Asc => "NULLS FIRST",
        SortDirection::Desc => "NULLS LAST",
    };
    let mut terms: Vec<String> = E::order_exprs(order.key)
        .iter()
        .map(|expr| format!("{} {} {}", expr, order.direction.to_sql(), nulls))
        .collect();
    terms.push("created_at DESC".to_string());
    terms.push("id ASC".to_string());
    terms.join(", ")
}

#[async_trait]
impl PgEntity for Expense {
    type Row = Expense;

    const TABLE: &'static str = "expenses";
    const COLUMNS: &'static str = "id, owner_id, title, amount, category, date, created_at";

    fn from_row(row: Expense) -> Result<Self, DatabaseError> {
        Ok(row)
    }

    fn order_exprs(key: SortKey) -> &'static [&'static str] {
        match key {
            SortKey::Date => &["date"],
            SortKey::Amount => &["amount"],
            SortKey::Title => &["title"],
            _ => &["created_at"],
        }
    }

    async fn insert_into(&self, conn: &mut PgConnection) -> Result<Self, DatabaseError> {
        let sql = format!(
            "INSERT INTO expenses ({}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            Self::COLUMNS,
            Self::COLUMNS
        );
        let row = sqlx::query_as::<_, Expense>(&sql)
            .bind(self.id)
            .bind(self.owner_id)
            .bind(&self.title)
            .bind(self.amount)
            .bind(&self.category)
            .bind(self.date)
            .bind(self.created_at)
            .fetch_one(conn)
            .await?;
        Ok(row)
    }

    async fn write_back(&self, conn: &mut PgConnection) -> Result<Self, DatabaseError> {
        let sql = format!(
            "UPDATE expenses SET title = $3, amount = $4, category = $5, date = $6 \
             WHERE id = $1 AND owner_id = $2 RETURNING {}",
            Self::COLUMNS
        );
        let row = sqlx::query_as::<_, Expense>(&sql)
            .bind(self.id)
            .bind(self.owner_id)
            .bind(&self.title)
            .bind(self.amount)
            .bind(&self.category)
            .bind(self.date)
            .fetch_one(conn)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl PgEntity for Income {
    type Row = Income;

    const TABLE: &'static str = "incomes";
    const COLUMNS: &'static str = "id, owner_id, amount, savings_goal, month, year, created_at";

    fn from_row(row: Income) -> Result<Self, DatabaseError> {
        Ok(row)
    }

    fn order_exprs(key: SortKey) -> &'static [&'static str] {
        match key {
            SortKey::Period => &["year", "month"],
            SortKey::Amount => &["amount"],
            _ => &["created_at"],
        }
    }

    async fn insert_into(&self, conn: &mut PgConnection) -> Result<Self, DatabaseError> {
        let sql = format!(
            "INSERT INTO incomes ({}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            Self::COLUMNS,
            Self::COLUMNS
        );
        let row = sqlx::query_as::<_, Income>(&sql)
            .bind(self.id)
            .bind(self.owner_id)
            .bind(self.amount)
            .bind(self.savings_goal)
            .bind(self.month)
            .bind(self.year)
            .bind(self.created_at)
            .fetch_one(conn)
            .await?;
        Ok(row)
    }

    async fn write_back(&self, conn: &mut PgConnection) -> Result<Self, DatabaseError> {
        let sql = format!(
            "UPDATE incomes SET amount = $3, savings_goal = $4, month = $5, year = $6 \
             WHERE id = $1 AND owner_id = $2 RETURNING {}",
            Self::COLUMNS
        );
        let row = sqlx::query_as::<_, Income>(&sql)
            .bind(self.id)
            .bind(self.owner_id)
            .bind(self.amount)
            .bind(self.savings_goal)
            .bind(self.month)
            .bind(self.year)
            .fetch_one(conn)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl PgEntity for Todo {
    type Row = TodoRow;

    const TABLE: &'static str = "todos";
    const COLUMNS: &'static str = "id, owner_id, title, completed, created_at, due_date, \
                                   estimated_time, category, priority, subtasks";

    fn from_row(row: TodoRow) -> Result<Self, DatabaseError> {
        Todo::try_from(row)
    }

    fn order_exprs(key: SortKey) -> &'static [&'static str] {
        match key {
            SortKey::DueDate => &["due_date"],
            SortKey::Priority => &["CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END"],
            SortKey::Title => &["title"],
            _ => &["created_at"],
        }
    }

    async fn insert_into(&self, conn: &mut PgConnection) -> Result<Self, DatabaseError> {
        let sql = format!(
            "INSERT INTO todos ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            Self::COLUMNS,
            Self::COLUMNS
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(self.id)
            .bind(self.owner_id)
            .bind(&self.title)
            .bind(self.completed)
            .bind(self.created_at)
            .bind(self.due_date)
            .bind(self.estimated_time)
            .bind(&self.category)
            .bind(self.priority.as_str())
            .bind(Json(&self.subtasks))
            .fetch_one(conn)
            .await?;
        Todo::try_from(row)
    }

    async fn write_back(&self, conn: &mut PgConnection) -> Result<Self, DatabaseError> {
        let sql = format!(
            "UPDATE todos SET title = $3, completed = $4, due_date = $5, estimated_time = $6, \
             category = $7, priority = $8, subtasks = $9 \
             WHERE id = $1 AND owner_id = $2 RETURNING {}",
            Self::COLUMNS
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(self.id)
            .bind(self.owner_id)
            .bind(&self.title)
            .bind(self.completed)
            .bind(self.due_date)
            .bind(self.estimated_time)
            .bind(&self.category)
            .bind(self.priority.as_str())
            .bind(Json(&self.subtasks))
            .fetch_one(conn)
            .await?;
        Todo::try_from(row)
    }
}

/// Postgres backend
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl<E: PgEntity> OwnedStore<E> for PgStore {
    async fn insert(&self, entity: E) -> Result<E, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        entity.insert_into(&mut *conn).await
    }

    async fn list(&self, owner_id: Uuid, order: ListOrder) -> Result<Vec<E>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE owner_id = $1 ORDER BY {}",
            E::COLUMNS,
            E::TABLE,
            order_clause::<E>(order)
        );
        let rows = sqlx::query_as::<_, E::Row>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(E::from_row).collect()
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<E>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND owner_id = $2",
            E::COLUMNS,
            E::TABLE
        );
        let row = sqlx::query_as::<_, E::Row>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(E::from_row).transpose()
    }

    async fn modify(&self, owner_id: Uuid, id: Uuid, mutation: Mutation<E>) -> Result<E, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND owner_id = $2 FOR UPDATE",
            E::COLUMNS,
            E::TABLE
        );
        let row = sqlx::query_as::<_, E::Row>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::not_found(E::KIND))?;

        let mut entity = E::from_row(row)?;
        // Dropping the transaction on error rolls it back
        mutation(&mut entity)?;
        if entity.id() != id || entity.owner_id() != owner_id {
            return Err(DatabaseError::Internal(format!("{} identity changed during update", E::KIND)));
        }

        let saved = entity.write_back(&mut *tx).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND owner_id = $2", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(E::KIND));
        }
        Ok(())
    }

    async fn purge_owner(&self, owner_id: Uuid) -> Result<u64, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE owner_id = $1", E::TABLE);
        let result = sqlx::query(&sql).bind(owner_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl IncomeStore for PgStore {
    async fn upsert_period(&self, candidate: Income) -> Result<Income, DatabaseError> {
        let sql = format!(
            "INSERT INTO incomes ({}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (owner_id, (COALESCE(month, -1)), (COALESCE(year, -1))) \
             DO UPDATE SET amount = EXCLUDED.amount, savings_goal = EXCLUDED.savings_goal \
             RETURNING {}",
            Income::COLUMNS,
            Income::COLUMNS
        );
        let row = sqlx::query_as::<_, Income>(&sql)
            .bind(candidate.id)
            .bind(candidate.owner_id)
            .bind(candidate.amount)
            .bind(candidate.savings_goal)
            .bind(candidate.month)
            .bind(candidate.year)
            .bind(candidate.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}

const PRINCIPAL_COLUMNS: &str = "id, username, password_hash, created_at";

#[async_trait]
impl PrincipalStore for PgStore {
    async fn find_by_username(
        &self,
        domain: Domain,
        username: &str,
    ) -> Result<Option<Principal>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE username = $1",
            PRINCIPAL_COLUMNS,
            domain.table()
        );
        let row = sqlx::query_as::<_, Principal>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, domain: Domain, id: Uuid) -> Result<Option<Principal>, DatabaseError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", PRINCIPAL_COLUMNS, domain.table());
        let row = sqlx::query_as::<_, Principal>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self, domain: Domain) -> Result<Vec<Principal>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at ASC, username ASC",
            PRINCIPAL_COLUMNS,
            domain.table()
        );
        let rows = sqlx::query_as::<_, Principal>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn insert(&self, domain: Domain, principal: Principal) -> Result<Principal, DatabaseError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4) RETURNING {}",
            domain.table(),
            PRINCIPAL_COLUMNS,
            PRINCIPAL_COLUMNS
        );
        let row = sqlx::query_as::<_, Principal>(&sql)
            .bind(principal.id)
            .bind(&principal.username)
            .bind(&principal.password_hash)
            .bind(principal.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(
        &self,
        domain: Domain,
        id: Uuid,
        update: PrincipalUpdate,
    ) -> Result<Principal, DatabaseError> {
        let sql = format!(
            "UPDATE {} SET username = COALESCE($2, username), \
             password_hash = COALESCE($3, password_hash) WHERE id = $1 RETURNING {}",
            domain.table(),
            PRINCIPAL_COLUMNS
        );
        sqlx::query_as::<_, Principal>(&sql)
            .bind(id)
            .bind(update.username)
            .bind(update.password_hash)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(domain.label()))
    }

    async fn delete(&self, domain: Domain, id: Uuid) -> Result<(), DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", domain.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(domain.label()));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_newest_first_with_id_tiebreak() {
        assert_eq!(
            order_clause::<Expense>(ListOrder::default()),
            "created_at DESC NULLS LAST, created_at DESC, id ASC"
        );
    }

    #[test]
    fn period_orders_year_before_month() {
        let order = ListOrder::new(SortKey::Period, SortDirection::Asc);
        assert_eq!(
            order_clause::<Income>(order),
            "year ASC NULLS FIRST, month ASC NULLS FIRST, created_at DESC, id ASC"
        );
    }

    #[test]
    fn priority_sorts_by_rank_not_text() {
        let order = ListOrder::new(SortKey::Priority, SortDirection::Desc);
        assert!(order_clause::<Todo>(order).starts_with("CASE priority WHEN 'low' THEN 0"));
    }
}
