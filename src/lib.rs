// Library surface for headless/integration tests and host adapters.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod classifier;
pub mod config;
pub mod ledger;
pub mod remote;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod tracker;
