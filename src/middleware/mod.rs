pub mod auth;
pub mod response;

pub use auth::{require_admin, require_user, AuthAdmin, AuthUser, RequestContext};
pub use response::{ApiResponse, ApiResult};
