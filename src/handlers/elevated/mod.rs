// handlers/elevated/mod.rs - Elevated handlers (admin token required)
//
// Admins manage user accounts; they never go through owner scoping.
pub mod admin;
pub mod users;
