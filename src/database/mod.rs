pub mod error;
pub mod manager;
pub mod memory;
pub mod models;
pub mod order;
pub mod postgres;
pub mod repository;
pub mod store;

pub use error::DatabaseError;
pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use order::{ListOrder, SortKey};
pub use postgres::PgStore;
pub use repository::Repository;
pub use store::{IncomeStore, Mutation, OwnedStore, PrincipalStore};
