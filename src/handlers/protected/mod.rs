// handlers/protected/mod.rs - Protected handlers (user token required)
//
// Every handler here receives `AuthUser` and scopes all data access to
// that principal.
pub mod expenses;
pub mod income;
pub mod session;
pub mod todo;
