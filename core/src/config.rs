//! Runtime configuration for the sync core.

use serde::Deserialize;

use crate::client::TodoClient;
use crate::error::ConfigError;
use crate::pager::Pager;

pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// How ids returned by the service are treated. See `client` module docs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// Overwrite returned ids with the id the request was made for.
    #[default]
    KeepRequestId,
    /// Use ids exactly as the service returns them.
    TrustServer,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub base_url: String,
    pub page_size: u32,
    pub id_policy: IdPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            id_policy: IdPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Read `TODO_API_BASE_URL`, `TODO_PAGE_SIZE` and `TODO_TRUST_SERVER_IDS`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup("TODO_API_BASE_URL") {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidBaseUrl(url));
            }
            config.base_url = url;
        }
        if let Some(value) = lookup("TODO_PAGE_SIZE") {
            config.page_size = match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "TODO_PAGE_SIZE",
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup("TODO_TRUST_SERVER_IDS") {
            config.id_policy = match value.trim() {
                "1" | "true" => IdPolicy::TrustServer,
                "0" | "false" => IdPolicy::KeepRequestId,
                _ => {
                    return Err(ConfigError::InvalidBool {
                        name: "TODO_TRUST_SERVER_IDS",
                        value,
                    })
                }
            };
        }
        Ok(config)
    }

    pub fn client(&self) -> TodoClient {
        TodoClient::new(&self.base_url).with_id_policy(self.id_policy)
    }

    /// A display-list pager fetching `page_size` todos per page.
    pub fn pager(&self) -> Pager {
        Pager::new(self.page_size)
    }
}
