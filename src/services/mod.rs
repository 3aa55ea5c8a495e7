pub mod accounts;
pub mod income;
pub mod subtasks;

pub use accounts::AccountService;
pub use income::IncomeLedger;
