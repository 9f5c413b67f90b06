//! Asset records, the status transition table and the registry that owns them.

mod registry;
mod sqlite_store;
mod store;
mod types;

pub use registry::*;
pub use sqlite_store::*;
pub use store::*;
pub use types::*;
