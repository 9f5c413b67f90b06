//! Cross-workflow asset status synchronization.

mod locks;
mod reconcile;
mod resolve;
mod synchronizer;

pub use locks::AssetLocks;
pub use reconcile::{ReconcileReport, Reconciler};
pub use resolve::{resolve, Resolution, WorkflowSnapshot};
pub use synchronizer::LifecycleSynchronizer;
