mod handle;
mod sqlite;
mod store;
mod types;
mod writer;

pub use handle::*;
pub use sqlite::*;
pub use store::*;
pub use types::*;
pub use writer::*;
