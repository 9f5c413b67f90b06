pub mod assets;
pub mod error;
pub mod events;
pub mod handlers;
pub mod issuances;
pub mod maintenance;
pub mod middleware;
pub mod repairs;
pub mod routes;
pub mod tickets;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use middleware::ActingUser;
pub use routes::create_router;

/// Maximum allowed page size for list endpoints
const MAX_LIMIT: i64 = 1000;

/// Default page size for list endpoints
const DEFAULT_LIMIT: i64 = 100;
