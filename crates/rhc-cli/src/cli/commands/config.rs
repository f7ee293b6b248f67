//! `rhc config` – print the config path and the effective configuration.

use anyhow::Result;
use rhc_core::config::{self, RhcConfig};

pub fn run_config(cfg: &RhcConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    let effective = RhcConfig {
        retry: Some(cfg.retry_or_default()),
        transport: Some(cfg.transport_or_default()),
        redaction: Some(cfg.redaction_or_default()),
    };
    print!("{}", effective.to_toml_string()?);
    Ok(())
}
