//! Support tickets and the workflow that moves them.

mod sqlite_store;
mod store;
mod types;
mod workflow;

pub use sqlite_store::SqliteTicketStore;
pub use store::{TicketFilter, TicketStore};
pub use types::{Comment, NewTicket, Ticket, TicketPriority, TicketStatus};
pub use workflow::TicketWorkflow;
