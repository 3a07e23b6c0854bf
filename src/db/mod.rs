pub mod cache;
pub mod flags;
pub mod initialize;
pub mod log;
pub mod migrate;
pub mod pool;
pub mod secure_store;
pub mod stats;
