pub mod config;
pub mod logging;

pub mod backoff;
pub mod channel;
pub mod client;
pub mod clients;
pub mod poller;
pub mod retry;
pub mod shutdown;
pub mod tunnel;

#[cfg(test)]
pub(crate) mod testing;
