//! CLI command handlers. Each command is in its own file.

mod list_clients;
mod run;

pub use list_clients::run_list_clients;
pub use run::{run_poller, RunOptions};
