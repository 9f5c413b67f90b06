//! Checkout and return of assets.

mod ledger;
mod sqlite_store;
mod store;
mod types;

pub use ledger::*;
pub use sqlite_store::*;
pub use store::*;
pub use types::*;
