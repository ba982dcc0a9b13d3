use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TickError};
use crate::model::ScopePolicy;

pub const DEFAULT_TABLE: &str = "todos";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection and behaviour settings, from `config.json` plus `TICK_*` env.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub scope: ScopePolicy,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            table: default_table(),
            scope: ScopePolicy::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where and how to reach the hosted service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub anon_key: String,
}

impl Config {
    /// Apply `TICK_URL`, `TICK_ANON_KEY`, `TICK_TABLE` and `TICK_SCOPE` from
    /// the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("TICK_URL") {
            self.url = Some(url);
        }
        if let Some(key) = get("TICK_ANON_KEY") {
            self.anon_key = Some(key);
        }
        if let Some(table) = get("TICK_TABLE") {
            self.table = table;
        }
        if let Some(scope) = get("TICK_SCOPE") {
            self.scope = parse_scope(&scope)?;
        }
        Ok(self)
    }

    pub fn endpoint(&self) -> Result<Endpoint> {
        match (&self.url, &self.anon_key) {
            (Some(url), Some(anon_key)) => Ok(Endpoint {
                url: url.trim_end_matches('/').to_string(),
                anon_key: anon_key.clone(),
            }),
            _ => Err(TickError::NotConfigured),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn parse_scope(input: &str) -> Result<ScopePolicy> {
    match input.trim().to_ascii_lowercase().as_str() {
        "mine" => Ok(ScopePolicy::Mine),
        "all" => Ok(ScopePolicy::All),
        _ => Err(TickError::InvalidScope(input.to_string())),
    }
}
