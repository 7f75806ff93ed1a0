use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backoff::Backoff;
use crate::channel::CurlOptions;
use crate::client::DEFAULT_COOLDOWN;
use crate::tunnel::TunnelCommands;

/// Run-level backoff parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Growth base in seconds for failure backoff (0 = use the loop period).
    pub exponential_base_secs: u64,
    /// Cap on the growth exponent (0 = uncapped).
    pub max_exponent: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            exponential_base_secs: 30,
            max_exponent: 6,
        }
    }
}

/// Commands used to bring VPN tunnels up and down (optional section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Program and leading arguments; the tunnel config path is appended.
    pub up_command: Vec<String>,
    pub down_command: Vec<String>,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        let commands = TunnelCommands::default();
        Self {
            up_command: commands.up,
            down_command: commands.down,
        }
    }
}

/// Global configuration loaded from `~/.config/feedpoll/config.toml`.
///
/// Built once at startup and passed down; nothing reads it from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Environment variable holding the API key in direct mode
    /// (`<NAME>_FILE` may point to a file instead).
    pub api_key_env: String,
    /// Request header carrying the API key.
    pub api_key_header: String,
    /// How long a client that hit 429/500/503 is avoided.
    pub cooldown_secs: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Default per-client rate limit in one-shot mode.
    pub direct_rate_limit_ms: u64,
    /// Default per-client rate limit when polling continuously.
    pub loop_rate_limit_ms: u64,
    /// Optional backoff tuning; if missing, built-in defaults are used.
    pub backoff: Option<BackoffConfig>,
    /// Optional tunnel commands; if missing, `wg-quick up`/`down` are used.
    pub tunnel: Option<TunnelConfig>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            api_key_env: "PKP_PLK_APIKEY".to_string(),
            api_key_header: "X-Api-Key".to_string(),
            cooldown_secs: DEFAULT_COOLDOWN.as_secs(),
            connect_timeout_secs: 30,
            request_timeout_secs: 120,
            direct_rate_limit_ms: 100,
            loop_rate_limit_ms: 1000,
            backoff: None,
            tunnel: None,
        }
    }
}

impl PollConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Per-client rate limit used when a client does not set its own.
    pub fn default_rate_limit(&self, looping: bool) -> Duration {
        if looping {
            Duration::from_millis(self.loop_rate_limit_ms)
        } else {
            Duration::from_millis(self.direct_rate_limit_ms)
        }
    }

    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.request_timeout_secs),
            ..CurlOptions::default()
        }
    }

    /// Backoff machine for a loop with the given period.
    pub fn backoff(&self, period: Duration) -> Backoff {
        let cfg = self.backoff.clone().unwrap_or_default();
        Backoff::new(period)
            .with_exponential_base(Duration::from_secs(cfg.exponential_base_secs))
            .with_max_exponent(cfg.max_exponent)
    }

    pub fn tunnel_commands(&self) -> TunnelCommands {
        let cfg = self.tunnel.clone().unwrap_or_default();
        TunnelCommands {
            up: cfg.up_command,
            down: cfg.down_command,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("feedpoll")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PollConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PollConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<PollConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: PollConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Read a secret from `$NAME`, or from the file named by `$NAME_FILE`.
pub fn api_key_from_env(name: &str) -> Result<String> {
    let key = match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            let file_var = format!("{name}_FILE");
            match std::env::var(&file_var) {
                Ok(path) if !path.is_empty() => fs::read_to_string(&path)
                    .with_context(|| format!("reading {file_var}={path}"))?,
                _ => String::new(),
            }
        }
    };

    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("{name} environment variable not set");
    }
    Ok(key.to_string())
}
