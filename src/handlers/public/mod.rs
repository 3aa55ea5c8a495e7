// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition for both domains and self-service registration.
pub mod accounts;

pub use accounts::{admin_login, login, register};
