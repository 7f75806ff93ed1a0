#[cfg(unix)]
pub mod reset_server;
pub mod script_server;
