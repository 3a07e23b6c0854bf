//! Local-first synchronization: reachability, the pending queue, replay and
//! the offline expiration policy.

pub mod dispatcher;
pub mod expiration;
pub mod handlers;
pub mod queue;
pub mod reachability;

pub use dispatcher::{SyncDispatcher, SyncFinished, SyncNotifier};
pub use expiration::ExpirationGuard;
pub use queue::PendingMutationQueue;
pub use reachability::{Reachability, ReachabilityMonitor, ReachabilityState};
