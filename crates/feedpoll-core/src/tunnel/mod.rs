//! VPN-tunnel backed clients.
//!
//! Each `*.conf` file in a directory describes one tunnel. Bringing it up and
//! down is delegated to external commands (`wg-quick up <file>` by default);
//! the resulting interface, named after the file stem as `wg-quick` does, is
//! then used as the outgoing interface of a curl channel.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::channel::{CurlChannel, CurlOptions};
use crate::client::Client;

/// Commands used to bring a tunnel up and down. The config path is appended
/// as the last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelCommands {
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl Default for TunnelCommands {
    fn default() -> Self {
        Self {
            up: vec!["wg-quick".to_string(), "up".to_string()],
            down: vec!["wg-quick".to_string(), "down".to_string()],
        }
    }
}

/// List tunnel configs (`*.conf`) in `dir`, sorted by path.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading tunnel dir {}", dir.display()))?;
    let mut configs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "conf") {
            configs.push(path);
        }
    }
    configs.sort();
    if configs.is_empty() {
        anyhow::bail!("no *.conf tunnel configs in {}", dir.display());
    }
    Ok(configs)
}

/// A tunnel that has been brought up.
#[derive(Debug, Clone)]
pub struct Tunnel {
    config: PathBuf,
    interface: String,
}

impl Tunnel {
    pub fn bring_up(config: &Path, commands: &TunnelCommands) -> Result<Self> {
        let interface = config
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("tunnel config {} has no usable name", config.display()))?
            .to_string();
        run(&commands.up, config)
            .with_context(|| format!("bringing up tunnel {}", config.display()))?;
        tracing::info!(interface = %interface, "tunnel up");
        Ok(Self {
            config: config.to_path_buf(),
            interface,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    pub fn tear_down(&self, commands: &TunnelCommands) -> Result<()> {
        run(&commands.down, &self.config)
            .with_context(|| format!("tearing down tunnel {}", self.interface))?;
        tracing::info!(interface = %self.interface, "tunnel down");
        Ok(())
    }
}

fn run(command: &[String], config: &Path) -> Result<()> {
    let (program, args) = command.split_first().context("empty tunnel command")?;
    let output = Command::new(program)
        .args(args)
        .arg(config)
        .output()
        .with_context(|| format!("running {program}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "`{} {}` exited with {}: {}",
            command.join(" "),
            config.display(),
            output.status,
            stderr.trim()
        );
    }
    Ok(())
}

/// Bring up one tunnel and wrap it in a client whose teardown brings it down.
pub fn tunnel_client(
    config: &Path,
    key: &str,
    rate_limit: Duration,
    commands: &TunnelCommands,
    options: &CurlOptions,
) -> Result<Client> {
    let tunnel = Tunnel::bring_up(config, commands)?;
    let channel = CurlChannel::new(options.clone().with_interface(tunnel.interface()));
    let label = format!("tunnel {}", tunnel.interface());
    let down = commands.clone();
    Ok(Client::new(key, channel)
        .with_rate_limit(rate_limit)
        .with_label(label)
        .with_teardown(move || tunnel.tear_down(&down)))
}

/// One client per tunnel config in `dir`, all sharing `key`.
///
/// If a bring-up fails, the clients built so far are dropped, which tears
/// their tunnels down again.
pub fn tunnel_clients(
    dir: &Path,
    key: &str,
    rate_limit: Duration,
    commands: &TunnelCommands,
    options: &CurlOptions,
) -> Result<Vec<Client>> {
    let configs = discover(dir)?;
    let mut clients = Vec::with_capacity(configs.len());
    for config in &configs {
        clients.push(tunnel_client(config, key, rate_limit, commands, options)?);
    }
    Ok(clients)
}
