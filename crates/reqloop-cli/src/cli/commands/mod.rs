//! CLI command handlers, one per file.

mod backoff;
mod config;
mod send;

pub use backoff::run_backoff;
pub use config::run_config;
pub use send::{run_send, SendOptions};
