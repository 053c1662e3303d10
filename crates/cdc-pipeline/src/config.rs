use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cdc_store::{MAX_EXPIRY, MIN_EXPIRY};
use cdc_types::KeySchema;

use crate::error::{ConfigError, ConfigResult};
use crate::filter::KeyFilter;

/// Detail type stamped on every published change event.
pub const DETAIL_TYPE: &str = "dynamo.item.changed";

/// Records at or above this many bytes have their images offloaded.
pub const DEFAULT_SIZE_THRESHOLD: u64 = 64 * 1024;

/// Lifetime of offloaded blobs and of their signed references.
pub const DEFAULT_OFFLOAD_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Bound on every blob-store and bus call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the change relay.
///
/// Built once at startup and passed by value into the coordinator. The
/// environment is only consulted by [`CdcConfig::from_env`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdcConfig {
    /// `source` field of published entries.
    pub event_source: String,
    /// Bus the entries are addressed to.
    pub bus_name: String,
    /// Bucket offloaded images are written into.
    pub bucket_name: Option<String>,
    /// Name of the partition-key attribute.
    pub partition_key: String,
    /// Name of the sort-key attribute, `None` for tables without one.
    pub sort_key: Option<String>,
    /// Size in bytes at which images are offloaded instead of embedded.
    pub size_threshold: u64,
    /// Retention of offloaded blobs and validity of their references.
    pub offload_ttl_secs: u64,
    /// Timeout for each blob-store or bus call.
    pub io_timeout_ms: u64,
    /// Records processed concurrently within one batch.
    pub max_concurrency: usize,
    /// Partition-key patterns (`exact` or `prefix*`). Empty lets all through.
    pub pk_filters: Vec<String>,
    /// Secret from which the reference-signing key is derived.
    #[serde(skip_serializing)]
    pub signing_secret: Option<String>,
}

impl Default for CdcConfig {
    fn default() -> Self {
        Self {
            event_source: "unknown".into(),
            bus_name: "default".into(),
            bucket_name: None,
            partition_key: "pk".into(),
            sort_key: Some("sk".into()),
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            offload_ttl_secs: DEFAULT_OFFLOAD_TTL.as_secs(),
            io_timeout_ms: DEFAULT_IO_TIMEOUT.as_millis() as u64,
            max_concurrency: 1,
            pk_filters: Vec::new(),
            signing_secret: None,
        }
    }
}

impl CdcConfig {
    /// Load from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&vars)
    }

    /// Load from an explicit variable map. Unset variables keep their
    /// defaults.
    ///
    /// Recognized variables: `EVENT_SOURCE`, `EVENT_BUS_NAME`, `BUCKET_NAME`,
    /// `CDC_PARTITION_KEY`, `CDC_SORT_KEY` (empty for none),
    /// `CDC_SIZE_THRESHOLD`, `CDC_OFFLOAD_TTL_SECS`, `CDC_IO_TIMEOUT_MS`,
    /// `CDC_MAX_CONCURRENCY`, `CDC_PK_FILTERS` (comma-separated) and
    /// `CDC_SIGNING_SECRET`.
    pub fn from_env_map(vars: &HashMap<String, String>) -> ConfigResult<Self> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();
        let mut config = Self::default();

        if let Some(source) = get("EVENT_SOURCE") {
            config.event_source = source;
        }
        if let Some(bus) = get("EVENT_BUS_NAME") {
            config.bus_name = bus;
        }
        config.bucket_name = get("BUCKET_NAME");
        if let Some(pk) = get("CDC_PARTITION_KEY") {
            config.partition_key = pk;
        }
        if let Some(sk) = vars.get("CDC_SORT_KEY") {
            config.sort_key = (!sk.is_empty()).then(|| sk.clone());
        }
        if let Some(v) = parse_var(vars, "CDC_SIZE_THRESHOLD")? {
            config.size_threshold = v;
        }
        if let Some(v) = parse_var(vars, "CDC_OFFLOAD_TTL_SECS")? {
            config.offload_ttl_secs = v;
        }
        if let Some(v) = parse_var(vars, "CDC_IO_TIMEOUT_MS")? {
            config.io_timeout_ms = v;
        }
        if let Some(v) = parse_var(vars, "CDC_MAX_CONCURRENCY")? {
            config.max_concurrency = v;
        }
        if let Some(filters) = get("CDC_PK_FILTERS") {
            config.pk_filters = filters
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        config.signing_secret = get("CDC_SIGNING_SECRET");

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: &Path) -> ConfigResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.event_source.is_empty() {
            return Err(ConfigError::invalid("event_source", "must not be empty"));
        }
        if self.bus_name.is_empty() {
            return Err(ConfigError::invalid("bus_name", "must not be empty"));
        }
        if self.partition_key.is_empty() {
            return Err(ConfigError::invalid("partition_key", "must not be empty"));
        }
        if self.size_threshold == 0 {
            return Err(ConfigError::invalid("size_threshold", "must be greater than zero"));
        }
        if self.io_timeout_ms == 0 {
            return Err(ConfigError::invalid("io_timeout_ms", "must be greater than zero"));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid("max_concurrency", "must be at least 1"));
        }
        let ttl = self.offload_ttl();
        if ttl < MIN_EXPIRY || ttl > MAX_EXPIRY {
            return Err(ConfigError::invalid(
                "offload_ttl_secs",
                format!(
                    "must be between {} and {} seconds",
                    MIN_EXPIRY.as_secs(),
                    MAX_EXPIRY.as_secs()
                ),
            ));
        }
        KeyFilter::compile(&self.pk_filters)?;
        Ok(())
    }

    /// The bucket name, required once offloading is wired up.
    pub fn bucket(&self) -> ConfigResult<&str> {
        self.bucket_name
            .as_deref()
            .ok_or(ConfigError::Missing("bucket_name"))
    }

    pub fn key_schema(&self) -> KeySchema {
        KeySchema {
            partition_key: self.partition_key.clone(),
            sort_key: self.sort_key.clone(),
        }
    }

    /// The compiled partition-key filter, `None` when no patterns are set.
    pub fn key_filter(&self) -> ConfigResult<Option<KeyFilter>> {
        if self.pk_filters.is_empty() {
            return Ok(None);
        }
        Ok(Some(KeyFilter::compile(&self.pk_filters)?))
    }

    pub fn offload_ttl(&self) -> Duration {
        Duration::from_secs(self.offload_ttl_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl std::fmt::Debug for CdcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdcConfig")
            .field("event_source", &self.event_source)
            .field("bus_name", &self.bus_name)
            .field("bucket_name", &self.bucket_name)
            .field("partition_key", &self.partition_key)
            .field("sort_key", &self.sort_key)
            .field("size_threshold", &self.size_threshold)
            .field("offload_ttl_secs", &self.offload_ttl_secs)
            .field("io_timeout_ms", &self.io_timeout_ms)
            .field("max_concurrency", &self.max_concurrency)
            .field("pk_filters", &self.pk_filters)
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, var: &'static str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(var).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map(Some).map_err(|e: T::Err| ConfigError::Env {
            var,
            reason: format!("`{raw}`: {e}"),
        }),
        None => Ok(None),
    }
}
