//! Channel-construction parameters for multi-channel mode.
//!
//! A clients file is a JSON array; each entry names a credential and how to
//! reach the API:
//!
//! ```json
//! [
//!   {"key_env": "PLK_KEY_A", "transport": "direct"},
//!   {"key": "...", "rate_limit_ms": 2000, "transport": "proxy", "url": "socks5h://10.0.0.2:1080"},
//!   {"key_env": "PLK_KEY_B", "transport": "wireguard", "config": "/etc/wireguard/pl1.conf"},
//!   {"key_env": "PLK_KEY_C", "transport": "random", "proxies": ["http://a:3128", "http://b:3128"]}
//! ]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::channel::{redact_url, Channel, CurlChannel, CurlOptions, RandomChannel};
use crate::client::Client;
use crate::config::{api_key_from_env, PollConfig};
use crate::tunnel;

/// How a client reaches the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum TransportSpec {
    /// Default route.
    Direct,
    /// Through a proxy URL.
    Proxy { url: String },
    /// Bound to an already configured network interface.
    Interface { name: String },
    /// Through a WireGuard tunnel brought up from `config`.
    Wireguard { config: PathBuf },
    /// Uniformly over several proxies, one picked per request.
    Random { proxies: Vec<String> },
}

/// One entry of the clients file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSpec {
    /// API key given inline.
    #[serde(default)]
    pub key: Option<String>,
    /// Environment variable holding the API key (or `<NAME>_FILE`).
    #[serde(default)]
    pub key_env: Option<String>,
    /// Per-client rate limit; the config default when missing.
    #[serde(default)]
    pub rate_limit_ms: Option<u64>,
    /// Name used in logs instead of the generated one.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub transport: TransportSpec,
}

impl ClientSpec {
    pub fn resolve_key(&self) -> Result<String> {
        match (&self.key, &self.key_env) {
            (Some(key), _) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            (_, Some(name)) => api_key_from_env(name),
            _ => anyhow::bail!("client has neither `key` nor `key_env`"),
        }
    }

    /// Log label for this client; never includes the key.
    pub fn describe(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match &self.transport {
            TransportSpec::Direct => "direct".to_string(),
            TransportSpec::Proxy { url } => format!("proxy {}", redact_url(url)),
            TransportSpec::Interface { name } => format!("interface {name}"),
            TransportSpec::Wireguard { config } => {
                let name = config.file_stem().and_then(|s| s.to_str()).unwrap_or("?");
                format!("tunnel {name}")
            }
            TransportSpec::Random { proxies } => format!("random over {} proxies", proxies.len()),
        }
    }

    pub fn rate_limit(&self, cfg: &PollConfig, looping: bool) -> Duration {
        self.rate_limit_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| cfg.default_rate_limit(looping))
    }
}

/// Fields every entry may carry.
const COMMON_FIELDS: &[&str] = &["key", "key_env", "rate_limit_ms", "label", "transport"];

/// Extra fields allowed by each transport.
fn transport_fields(transport: &str) -> &'static [&'static str] {
    match transport {
        "proxy" => &["url"],
        "interface" => &["name"],
        "wireguard" => &["config"],
        "random" => &["proxies"],
        _ => &[],
    }
}

/// Reject fields neither the entry nor its transport knows, so a typo such as
/// `rate_limit` is an error instead of a silent default. serde cannot deny
/// unknown fields through the flattened transport, hence the manual check.
fn check_fields(entry: &serde_json::Value) -> Result<()> {
    let Some(fields) = entry.as_object() else {
        return Ok(());
    };
    let transport = fields
        .get("transport")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    let extra = transport_fields(transport);
    for name in fields.keys() {
        if !COMMON_FIELDS.contains(&name.as_str()) && !extra.contains(&name.as_str()) {
            let mut known: Vec<&str> = COMMON_FIELDS.to_vec();
            known.extend_from_slice(extra);
            anyhow::bail!("unknown field `{}`, expected one of {}", name, known.join(", "));
        }
    }
    Ok(())
}

/// Parse the contents of a clients file.
pub fn parse_specs(data: &str) -> Result<Vec<ClientSpec>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(data).context("clients file must be a JSON array")?;
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| parse_entry(entry).with_context(|| format!("client #{}", i + 1)))
        .collect()
}

fn parse_entry(entry: serde_json::Value) -> Result<ClientSpec> {
    check_fields(&entry)?;
    Ok(serde_json::from_value(entry)?)
}

/// Read and parse a clients file.
pub fn load_specs(path: &Path) -> Result<Vec<ClientSpec>> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading clients {}", path.display()))?;
    parse_specs(&data).with_context(|| format!("parsing clients {}", path.display()))
}

/// Client for direct mode: default route, single key.
pub fn direct_client(key: &str, rate_limit: Duration, options: &CurlOptions) -> Client {
    Client::new(key, CurlChannel::new(options.clone())).with_rate_limit(rate_limit)
}

/// Build every client in `specs`. Tunnels are brought up here; on error the
/// clients built so far are dropped and torn down.
pub fn build_clients(
    specs: &[ClientSpec],
    cfg: &PollConfig,
    looping: bool,
) -> Result<Vec<Client>> {
    if specs.is_empty() {
        anyhow::bail!("clients file lists no clients");
    }
    let mut clients = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        let client = build_client(spec, cfg, looping)
            .with_context(|| format!("client #{} ({})", i + 1, spec.describe()))?;
        clients.push(client);
    }
    Ok(clients)
}

fn build_client(spec: &ClientSpec, cfg: &PollConfig, looping: bool) -> Result<Client> {
    let key = spec.resolve_key()?;
    let rate_limit = spec.rate_limit(cfg, looping);
    let options = cfg.curl_options();

    let client = match &spec.transport {
        TransportSpec::Direct => direct_client(&key, rate_limit, &options),
        TransportSpec::Proxy { url } => {
            check_proxy_url(url)?;
            Client::new(&*key, CurlChannel::new(options.with_proxy(url.as_str())))
                .with_rate_limit(rate_limit)
        }
        TransportSpec::Interface { name } => {
            Client::new(&*key, CurlChannel::new(options.with_interface(name.as_str())))
                .with_rate_limit(rate_limit)
        }
        TransportSpec::Wireguard { config } => {
            tunnel::tunnel_client(config, &key, rate_limit, &cfg.tunnel_commands(), &options)?
        }
        TransportSpec::Random { proxies } => {
            if proxies.is_empty() {
                anyhow::bail!("random transport needs at least one proxy");
            }
            let mut channels: Vec<Box<dyn Channel>> = Vec::with_capacity(proxies.len());
            for url in proxies {
                check_proxy_url(url)?;
                channels.push(Box::new(CurlChannel::new(
                    options.clone().with_proxy(url.as_str()),
                )));
            }
            Client::new(&*key, RandomChannel::new(channels)).with_rate_limit(rate_limit)
        }
    };
    Ok(client.with_label(spec.describe()))
}

fn check_proxy_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("invalid proxy URL {}", redact_url(url)))?;
    Ok(())
}
