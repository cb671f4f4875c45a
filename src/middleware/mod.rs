pub mod access;
pub mod authenticate;
pub mod rate_limit;
pub mod recover;
pub mod response;

pub use access::{require_activated, require_authenticated, require_permission, Requirement};
pub use authenticate::authenticate;
pub use rate_limit::{rate_limit, ClientRateLimiter};
pub use recover::{catch_panic, install_panic_hook};
pub use response::{ApiResponse, ApiResult};
