//! `reqloop config`: show where the config lives and what is in effect.

use anyhow::Result;
use reqloop_core::config::{self, ReqloopConfig};

pub async fn run_config(cfg: &ReqloopConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(&redacted(cfg))?);
    Ok(())
}

fn redacted(cfg: &ReqloopConfig) -> ReqloopConfig {
    let mut shown = cfg.clone();
    if let Some(auth) = shown.auth.as_mut() {
        if auth.secret.is_some() {
            auth.secret = Some("***".to_string());
        }
    }
    if let Some(proxy) = shown.proxy.as_mut() {
        if proxy.password.is_some() {
            proxy.password = Some("***".to_string());
        }
    }
    shown
}
