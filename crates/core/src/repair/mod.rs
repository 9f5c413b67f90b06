//! Repair records and the coordinator bridging tickets to physical repairs.

mod coordinator;
mod sqlite_store;
mod store;
mod types;

pub use coordinator::*;
pub use sqlite_store::*;
pub use store::*;
pub use types::*;
