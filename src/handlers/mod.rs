// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (user token) → Elevated (admin token).
// Each tier's routes are wrapped with its guard in app.rs.
pub mod elevated;
pub mod protected;
pub mod public;
