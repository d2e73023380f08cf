use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Parallelism used when the configured value is zero or negative.
pub const DEFAULT_PARALLEL: usize = 3;

/// HTTP client settings shared by every download worker (`[http]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// TCP keep-alive probe interval in seconds.
    pub keepalive_secs: u64,
    /// Upper bound on idle transfer handles (and their open connections) kept for reuse.
    pub max_idle_connections: u32,
    /// Budget for the TLS handshake in seconds.
    pub tls_handshake_timeout_secs: u64,
    /// Disable TLS certificate and host verification.
    pub skip_insecure: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            keepalive_secs: 30,
            max_idle_connections: 100,
            tls_handshake_timeout_secs: 10,
            skip_insecure: false,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn tls_handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_handshake_timeout_secs)
    }
}

/// Global configuration loaded from `~/.config/brd/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrdConfig {
    /// Concurrent downloads; zero or negative means the default of 3.
    #[serde(default = "default_parallel")]
    pub parallel: i64,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_parallel() -> i64 {
    DEFAULT_PARALLEL as i64
}

impl Default for BrdConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            http: HttpConfig::default(),
        }
    }
}

impl BrdConfig {
    /// Number of workers actually started.
    pub fn effective_parallel(&self) -> usize {
        effective_parallel(self.parallel)
    }
}

/// Clamp a configured parallelism: values `<= 0` select [`DEFAULT_PARALLEL`].
pub fn effective_parallel(configured: i64) -> usize {
    if configured <= 0 {
        DEFAULT_PARALLEL
    } else {
        usize::try_from(configured).unwrap_or(usize::MAX)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("brd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BrdConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BrdConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BrdConfig = toml::from_str(&data)?;
    Ok(cfg)
}
