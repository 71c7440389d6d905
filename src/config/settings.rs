//! Settings structures for Duck Search configuration

use crate::export::ExportFormat;
use crate::query::{Region, ResultKind, SafeSearch, MAX_RESULTS_LIMIT};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main settings structure, loaded from `settings.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub search: SearchSettings,
    pub outgoing: OutgoingSettings,
    pub session: SessionSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Merge with environment variables (DUCK_SEARCH_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("DUCK_SEARCH_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("DUCK_SEARCH_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("DUCK_SEARCH_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Ok(val) = std::env::var("DUCK_SEARCH_REGION") {
            if let Ok(region) = val.parse() {
                self.search.region = region;
            }
        }
    }

    /// Reject values the search form could never produce
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RESULTS_LIMIT).contains(&self.search.max_results) {
            anyhow::bail!(
                "search.max_results must be between 1 and {}, got {}",
                MAX_RESULTS_LIMIT,
                self.search.max_results
            );
        }
        let timeout = self.outgoing.request_timeout;
        if !timeout.is_finite() || timeout <= 0.0 {
            anyhow::bail!("outgoing.request_timeout must be a positive number of seconds, got {}", timeout);
        }
        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
    /// Instance name displayed in UI
    pub instance_name: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "Duck Search".to_string(),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
    /// Public instance mode (affects robots.txt)
    pub public_instance: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8888,
            bind_address: "127.0.0.1".to_string(),
            public_instance: false,
        }
    }
}

/// Defaults applied to the search form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub region: Region,
    pub safesearch: SafeSearch,
    pub kind: ResultKind,
    /// Number of results requested when the form leaves it blank
    pub max_results: u32,
    pub export_format: ExportFormat,
    /// Keyword pre-filled in the search box
    pub default_keyword: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            region: Region::PrimaryLocale,
            safesearch: SafeSearch::Off,
            kind: ResultKind::Text,
            max_results: MAX_RESULTS_LIMIT,
            export_format: ExportFormat::Xlsx,
            default_keyword: "教師\u{3000}なり方".to_string(),
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Request timeout in seconds
    pub request_timeout: f64,
    /// Appended to the generated user agent
    pub useragent_suffix: Option<String>,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
    /// DuckDuckGo endpoints
    pub duckduckgo: DuckDuckGoSettings,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 10.0,
            useragent_suffix: None,
            verify_ssl: true,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
            duckduckgo: DuckDuckGoSettings::default(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// DuckDuckGo endpoint URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckDuckGoSettings {
    /// Site root, also hosts the JSON endpoints
    pub base_url: String,
    /// JavaScript-free HTML endpoint used for text search
    pub html_url: String,
}

impl Default for DuckDuckGoSettings {
    fn default() -> Self {
        Self {
            base_url: "https://duckduckgo.com".to_string(),
            html_url: "https://html.duckduckgo.com/html/".to_string(),
        }
    }
}

/// Session storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds of inactivity before a session is dropped
    pub ttl: u64,
    /// Maximum number of sessions kept in memory
    pub max_sessions: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: 3600,
            max_sessions: 10_000,
        }
    }
}
