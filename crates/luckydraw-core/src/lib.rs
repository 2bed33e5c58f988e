// Library root: re-exports all modules so the console binary and the
// integration tests can reach the crate's public API.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod draw;
pub mod error;
pub mod ledger;
pub mod pool;
pub mod protocol;
pub mod session;
