//! Process configuration, read from the environment.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use ckan::{CatalogClientConfig, DEFAULT_CATALOG_URL};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EnvVars {
    #[serde(default = "default_listen_addr")]
    pub host: Ipv4Addr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
    #[serde(default = "default_catalog_timeout_secs")]
    pub catalog_timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_listen_addr() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}

fn default_port() -> u16 {
    8000
}

fn default_catalog_url() -> String {
    String::from(DEFAULT_CATALOG_URL)
}

fn default_catalog_timeout_secs() -> u64 {
    10
}

impl EnvVars {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    pub fn catalog_config(&self) -> CatalogClientConfig {
        CatalogClientConfig {
            base_url: self.catalog_url.clone(),
            timeout: Duration::from_secs(self.catalog_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}
