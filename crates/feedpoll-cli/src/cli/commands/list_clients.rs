//! `feedpoll clients` – validate a clients file without bringing anything up.

use anyhow::Result;
use feedpoll_core::clients::{self, ClientSpec};
use feedpoll_core::config::PollConfig;
use std::path::Path;

pub fn run_list_clients(cfg: &PollConfig, path: &Path) -> Result<()> {
    let specs = clients::load_specs(path)?;
    if specs.is_empty() {
        anyhow::bail!("{} lists no clients", path.display());
    }
    for (i, spec) in specs.iter().enumerate() {
        println!("{}", describe_line(i + 1, spec, cfg));
    }
    Ok(())
}

fn key_source(spec: &ClientSpec) -> String {
    match (&spec.key, &spec.key_env) {
        (Some(_), _) => "inline key".to_string(),
        (None, Some(name)) => format!("key from ${name}"),
        (None, None) => "no key".to_string(),
    }
}

fn describe_line(n: usize, spec: &ClientSpec, cfg: &PollConfig) -> String {
    let once = spec.rate_limit(cfg, false).as_millis();
    let looping = spec.rate_limit(cfg, true).as_millis();
    format!(
        "{:>3}  {:<32}  {:<24}  rate limit {} ms (loop {} ms)",
        n,
        spec.describe(),
        key_source(spec),
        once,
        looping
    )
}
