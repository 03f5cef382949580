//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

use labstock_infra::LedgerConfig;
use labstock_observability::LogFormat;
use labstock_stock::BaselinePolicy;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Shared secret used when `JWT_SECRET` is absent. Development only.
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` when `JWT_SECRET` is unset; `main` falls back to [`DEV_JWT_SECRET`].
    pub jwt_secret: Option<String>,
    pub log_format: LogFormat,
    pub ledger: LedgerConfig,
    /// JSON catalog seed (`{"rooms": [...], "items": [...]}`).
    pub catalog_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset and empty values take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("LABSTOCK_BIND")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("LABSTOCK_BIND must be a socket address")?;

        let log_format = match get("LABSTOCK_LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().context("LABSTOCK_LOG_FORMAT")?,
            None => LogFormat::default(),
        };

        let baseline_policy = match get("LABSTOCK_BASELINE_POLICY") {
            Some(raw) => raw
                .parse::<BaselinePolicy>()
                .context("LABSTOCK_BASELINE_POLICY")?,
            None => BaselinePolicy::default(),
        };

        let enforce_available_stock = match get("LABSTOCK_ENFORCE_AVAILABLE_STOCK") {
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .context("LABSTOCK_ENFORCE_AVAILABLE_STOCK must be true or false")?,
            None => LedgerConfig::default().enforce_available_stock,
        };

        Ok(Self {
            bind_addr,
            jwt_secret: get("JWT_SECRET"),
            log_format,
            ledger: LedgerConfig {
                baseline_policy,
                enforce_available_stock,
            },
            catalog_path: get("LABSTOCK_CATALOG_PATH").map(PathBuf::from),
        })
    }
}
