//! Environment-driven configuration.

use chrono_tz::Tz;
use custom_debug_derive::Debug;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

use crate::portal::client::DEFAULT_TIME_ZONE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identity provider username (`CNET_USERNAME`).
    pub cnet_username: String,
    /// Identity provider password (`CNET_PASSWORD`).
    #[debug(with = crate::fmt::redacted)]
    pub cnet_password: String,
    /// Directory holding stored credentials, the cache and the calendar output.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_time_zone", deserialize_with = "deserialize_time_zone")]
    pub time_zone: Tz,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_time_zone() -> Tz {
    DEFAULT_TIME_ZONE
}

fn deserialize_time_zone<'de, D>(deserializer: D) -> Result<Tz, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    name.parse::<Tz>().map_err(serde::de::Error::custom)
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, figment::Error> {
        use figment::{Figment, providers::Env};
        Figment::new().merge(Env::raw()).extract()
    }

    pub fn dsf_credentials_path(&self) -> PathBuf {
        self.data_dir.join("dsf-creds.json")
    }

    pub fn cnet_credentials_path(&self) -> PathBuf {
        self.data_dir.join("cnet-creds.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("cache.json")
    }

    pub fn calendar_path(&self) -> PathBuf {
        self.data_dir.join("calendar.ics")
    }
}
