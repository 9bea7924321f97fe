use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub storage: StorageConfig,

    pub auth: AuthConfig,

    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite URL, e.g. `sqlite:data/podlog.db` or `sqlite::memory:`.
    pub database_path: String,

    /// Maximum pool connections (default: 5)
    pub max_connections: u32,

    /// Minimum pool connections (default: 1)
    pub min_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/podlog.db".to_string(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for bearer tokens. Must be set; at least 32 bytes.
    /// Loaded once at startup, rotation requires a restart.
    pub token_secret: String,

    /// Lifetime of a session token (default: 30 minutes).
    pub session_ttl_minutes: u64,

    /// Lifetime ceiling for "remember me" logins (default: 30 days).
    /// Refreshed session tokens never outlive this window.
    pub remember_ttl_days: u64,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            session_ttl_minutes: 30,
            remember_ttl_days: 30,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Live commanders a single user may hold (default: 100).
    pub max_commanders_per_user: u64,

    /// Cap on `limit` for every paginated read (default: 100).
    pub max_page_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_commanders_per_user: 100,
            max_page_size: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("podlog").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".podlog").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.max_connections == 0 {
            anyhow::bail!("storage.max_connections must be > 0");
        }

        if self.storage.min_connections > self.storage.max_connections {
            anyhow::bail!("storage.min_connections must not exceed max_connections");
        }

        if self.auth.token_secret.len() < 32 {
            anyhow::bail!("auth.token_secret must be set and at least 32 bytes");
        }

        if self.auth.session_ttl_minutes == 0 || self.auth.remember_ttl_days == 0 {
            anyhow::bail!("auth token lifetimes must be > 0");
        }

        // Argon2 rejects memory below 8 KiB and zero lanes/passes; catch it
        // here instead of on the first login.
        if self.auth.argon2_memory_cost_kib < 8
            || self.auth.argon2_time_cost == 0
            || self.auth.argon2_parallelism == 0
        {
            anyhow::bail!("auth argon2 cost parameters are out of range");
        }

        if self.limits.max_commanders_per_user == 0 || self.limits.max_page_size == 0 {
            anyhow::bail!("limits must be > 0");
        }

        Ok(())
    }
}
