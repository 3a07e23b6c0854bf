pub mod backfill;
pub mod engine;
pub mod history;
pub mod incident;
pub mod log;
pub mod notifications;
pub mod outbox;
pub mod punch;
pub mod reconcile;
pub mod session;
