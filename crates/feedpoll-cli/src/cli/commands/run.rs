//! `feedpoll run` – fetch once or poll continuously.

use anyhow::Result;
use feedpoll_core::client::{Client, Pool};
use feedpoll_core::config::{self, PollConfig};
use feedpoll_core::poller::{Poller, Target};
use feedpoll_core::shutdown::ShutdownToken;
use feedpoll_core::{clients, tunnel};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Arguments of `feedpoll run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub url: String,
    pub output: PathBuf,
    pub loop_secs: u64,
    pub clients: Option<PathBuf>,
    pub tunnels: Option<PathBuf>,
}

impl RunOptions {
    pub fn looping(&self) -> bool {
        self.loop_secs > 0
    }
}

pub fn run_poller(cfg: &PollConfig, opts: &RunOptions) -> Result<()> {
    let target = Target::new(&opts.url, &cfg.api_key_header, opts.output.clone())?;
    // Installed before any tunnel comes up, so a signal never skips teardown.
    let shutdown = ShutdownToken::from_signals()?;
    let clients = build_clients(
        cfg,
        opts.looping(),
        opts.clients.as_deref(),
        opts.tunnels.as_deref(),
    )?;
    let pool = Pool::new(clients).with_cooldown(cfg.cooldown());
    tracing::info!(clients = pool.len(), "client pool ready");

    let mut poller = Poller::new(pool, target).with_shutdown(shutdown);
    let result = if opts.looping() {
        let mut backoff = cfg.backoff(Duration::from_secs(opts.loop_secs));
        poller.run_loop(&mut backoff)
    } else {
        poller.run_once().map(|_| ())
    };

    // Tunnels must come down whether polling failed, finished or was interrupted.
    let closed = poller.close();
    result?;
    closed
}

fn build_clients(
    cfg: &PollConfig,
    looping: bool,
    clients_file: Option<&Path>,
    tunnel_dir: Option<&Path>,
) -> Result<Vec<Client>> {
    let rate_limit = cfg.default_rate_limit(looping);
    match (clients_file, tunnel_dir) {
        (Some(path), _) => {
            let specs = clients::load_specs(path)?;
            clients::build_clients(&specs, cfg, looping)
        }
        (None, Some(dir)) => {
            let key = config::api_key_from_env(&cfg.api_key_env)?;
            tunnel::tunnel_clients(
                dir,
                &key,
                rate_limit,
                &cfg.tunnel_commands(),
                &cfg.curl_options(),
            )
        }
        (None, None) => {
            let key = config::api_key_from_env(&cfg.api_key_env)?;
            Ok(vec![clients::direct_client(
                &key,
                rate_limit,
                &cfg.curl_options(),
            )])
        }
    }
}
