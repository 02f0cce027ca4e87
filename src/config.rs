// Data source configuration: where the dataset lives and how to read it

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    loader::{DatasetLoader, HeaderPolicy},
    source::FileSystemResolver,
};

pub const ENV_CSV_LOCATION: &str = "FLIGHTS_CSV_LOCATION";
pub const ENV_DATA_DIR: &str = "FLIGHTS_DATA_DIR";
pub const ENV_HEADER: &str = "FLIGHTS_HEADER";
pub const ENV_RETRY_FAILED_LOAD: &str = "FLIGHTS_RETRY_FAILED_LOAD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    // Resolved relative to base_dir
    pub csv_location: String,
    pub base_dir: PathBuf,
    pub header: HeaderPolicy,
    pub retry_failed_load: bool,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            csv_location: "flights.csv".to_string(),
            base_dir: PathBuf::from("samples"),
            header: HeaderPolicy::Auto,
            retry_failed_load: false,
        }
    }
}

impl DataSourceConfig {
    // Defaults overridden by any `FLIGHTS_*` environment variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(location) = lookup(ENV_CSV_LOCATION) {
            self.csv_location = location;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.base_dir = PathBuf::from(dir);
        }
        if let Some(header) = lookup(ENV_HEADER) {
            self.header = header.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_HEADER,
                value: header.clone(),
                expected: "one of auto, present, absent",
            })?;
        }
        if let Some(retry) = lookup(ENV_RETRY_FAILED_LOAD) {
            self.retry_failed_load = parse_bool(ENV_RETRY_FAILED_LOAD, &retry)?;
        }
        Ok(self)
    }

    pub fn resolver(&self) -> FileSystemResolver {
        FileSystemResolver::new(self.base_dir.clone())
    }

    pub fn loader(&self) -> DatasetLoader {
        DatasetLoader::new(self.resolver()).with_header_policy(self.header)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            expected: "true or false",
        }),
    }
}
