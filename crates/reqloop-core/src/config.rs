use crate::executor::RequestExecutor;
use crate::redirect::DEFAULT_MAX_REDIRECTS;
use crate::retry::{ExponentialBackoff, DEFAULT_MAX_RETRIES};
use crate::signer::{AuthScheme, Credential};
use crate::transport::{CurlOptions, CurlTransport, ProxySettings, Transport};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Backoff tuning (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Scale for transport and server failures.
    pub scale_ms: u64,
    /// Scale after a 429, before jitter.
    pub throttle_scale_ms: u64,
    /// Upper bound of the uniform jitter added to `throttle_scale_ms`.
    pub throttle_jitter_ms: u64,
    /// Values above 20000 are clamped.
    pub ceiling_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            scale_ms: 300,
            throttle_scale_ms: 500,
            throttle_jitter_ms: 100,
            ceiling_ms: 20_000,
        }
    }
}

impl BackoffConfig {
    pub fn to_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff::default()
            .with_scale(Duration::from_millis(self.scale_ms))
            .with_throttle_scale(
                Duration::from_millis(self.throttle_scale_ms),
                Duration::from_millis(self.throttle_jitter_ms),
            )
            .with_ceiling(Duration::from_millis(self.ceiling_ms))
    }
}

/// API credential and signing scheme.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub scheme: AuthScheme,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl AuthConfig {
    /// Both id and secret are required; a half-filled section means unsigned.
    pub fn credential(&self) -> Option<Credential> {
        match (&self.id, &self.secret) {
            (Some(id), Some(secret)) => Some(Credential::new(id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("scheme", &self.scheme)
            .field("id", &self.id)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Global configuration loaded from `~/.config/reqloop/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReqloopConfig {
    /// Retries after the first attempt before giving up.
    pub max_retries: u32,
    /// Redirect hops followed per call.
    pub max_redirects: u32,
    /// 0 = no timeout.
    pub connect_timeout_secs: u64,
    /// 0 = no timeout.
    pub socket_timeout_secs: u64,
    pub max_connections_per_host: u32,
    pub backoff: Option<BackoffConfig>,
    pub proxy: Option<ProxySettings>,
    pub auth: Option<AuthConfig>,
}

impl Default for ReqloopConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            connect_timeout_secs: 0,
            socket_timeout_secs: 0,
            max_connections_per_host: 10,
            backoff: None,
            proxy: None,
            auth: None,
        }
    }
}

impl ReqloopConfig {
    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: secs(self.connect_timeout_secs),
            socket_timeout: secs(self.socket_timeout_secs),
            proxy: self.proxy.clone(),
            max_connections_per_host: self.max_connections_per_host,
        }
    }

    /// Executor over a libcurl transport built from this config.
    pub fn executor(&self) -> RequestExecutor {
        self.executor_with(Arc::new(CurlTransport::new(self.curl_options())))
    }

    /// Executor over the given transport; transport settings in this config
    /// are ignored.
    pub fn executor_with(&self, transport: Arc<dyn Transport>) -> RequestExecutor {
        let mut builder = RequestExecutor::builder(transport)
            .max_retries(self.max_retries)
            .max_redirects(self.max_redirects);
        if let Some(backoff) = &self.backoff {
            builder = builder.default_backoff(backoff.to_policy());
        }
        if let Some(auth) = &self.auth {
            builder = builder.signer(auth.scheme.signer());
            if let Some(credential) = auth.credential() {
                builder = builder.credential(credential);
            }
        }
        builder.build()
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("reqloop")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReqloopConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ReqloopConfig::default();
        write_default(&path, &default_cfg)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path. Missing keys take defaults.
pub fn load_from(path: &Path) -> Result<ReqloopConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ReqloopConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

fn write_default(path: &Path, cfg: &ReqloopConfig) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml)?;
    Ok(())
}
