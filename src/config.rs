use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{Pmid, parse_pmid_list};
use crate::error::GeoMapError;
use crate::eutils::{DEFAULT_EUTILS_BASE, DEFAULT_GEO_BASE, Endpoints};
use crate::http::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "geo-pubmap.json";
pub const DEFAULT_PMIDS_PATH: &str = "./data/PMIDs_list.txt";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub pmids_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub snapshot_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub log_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub retry: Option<RetryEntry>,
    #[serde(default)]
    pub eutils_base: Option<String>,
    #[serde(default)]
    pub geo_base: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryEntry {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub wait_time_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub pmids_path: Utf8PathBuf,
    pub snapshot_path: Option<Utf8PathBuf>,
    pub log_path: Option<Utf8PathBuf>,
    pub retry: RetryPolicy,
    pub endpoints: Endpoints,
}

impl ResolvedConfig {
    /// Reads the whitespace-separated publication ids from `pmids_path`.
    pub fn read_pmids(&self) -> Result<Vec<Pmid>, GeoMapError> {
        read_pmid_file(&self.pmids_path)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// With no explicit path, a missing `geo-pubmap.json` means defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GeoMapError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| GeoMapError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| GeoMapError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, GeoMapError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(GeoMapError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let retry = config.retry.unwrap_or_default();
        let retry = RetryPolicy::new(
            retry
                .max_attempts
                .unwrap_or(RetryPolicy::DEFAULT_MAX_ATTEMPTS),
            Duration::from_millis(retry.wait_time_ms.unwrap_or(RetryPolicy::DEFAULT_WAIT_MS)),
        );

        let endpoints = Endpoints {
            eutils_base: trim_base(config.eutils_base, DEFAULT_EUTILS_BASE),
            geo_base: trim_base(config.geo_base, DEFAULT_GEO_BASE),
        };

        Ok(ResolvedConfig {
            schema_version,
            pmids_path: config
                .pmids_path
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_PMIDS_PATH)),
            snapshot_path: config.snapshot_path,
            log_path: config.log_path,
            retry,
            endpoints,
        })
    }
}

pub fn read_pmid_file(path: &Utf8Path) -> Result<Vec<Pmid>, GeoMapError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| GeoMapError::PmidList(format!("read {path}: {err}")))?;
    parse_pmid_list(&content)
}

fn trim_base(value: Option<String>, default: &str) -> String {
    value
        .map(|base| base.trim_end_matches('/').to_string())
        .unwrap_or_else(|| default.to_string())
}
