//! Runtime server configuration
//!
//! `ServerConfig` is read once from environment variables at startup and is
//! immutable afterwards. Unset variables fall back to defaults; set but
//! unparseable variables are an error naming the variable.

use axum::http::HeaderValue;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use treenode_core::{
    BranchConfig, BranchStrategy, DeletePolicy, NodeServiceConfig, MAX_DEPTH_CEILING,
};

/// How admin list endpoints answer when there is nothing to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyResultPolicy {
    /// 404 with "Nodes not found"
    #[default]
    NotFound,
    /// 200 with an empty `data` array
    EmptySuccess,
}

impl FromStr for EmptyResultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not-found" | "not_found" | "404" => Ok(Self::NotFound),
            "empty-success" | "empty_success" | "empty" | "200" => Ok(Self::EmptySuccess),
            other => Err(format!(
                "unknown empty result policy '{}' (expected 'not-found' or 'empty-success')",
                other
            )),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address (`SERVER_HOST`)
    pub host: IpAddr,

    /// Bind port (`SERVER_PORT`)
    pub port: u16,

    /// libsql database file (`DATABASE_PATH`)
    pub database_path: PathBuf,

    /// Delete policy and branch limits handed to the core
    pub service: NodeServiceConfig,

    /// Admin list endpoints: 404 or empty 200 (`EMPTY_RESULT_POLICY`)
    pub empty_result_policy: EmptyResultPolicy,

    /// Also mount the flat `/tree_nodes` routes (`LEGACY_ROUTES`)
    pub legacy_routes: bool,

    /// Single allowed CORS origin; any origin when unset (`CORS_ALLOW_ORIGIN`)
    pub cors_allow_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            database_path: PathBuf::from("./data/tree_nodes.db"),
            service: NodeServiceConfig::default(),
            empty_result_policy: EmptyResultPolicy::default(),
            legacy_routes: false,
            cors_allow_origin: None,
        }
    }
}

impl ServerConfig {
    /// Build configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (used by tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let branch_defaults = BranchConfig::default();

        let host = parse_var(&lookup, "SERVER_HOST", defaults.host)?;
        let port = parse_var(&lookup, "SERVER_PORT", defaults.port)?;
        let database_path = lookup("DATABASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let strategy: BranchStrategy =
            parse_var(&lookup, "BRANCH_STRATEGY", branch_defaults.strategy)?;
        let max_depth: usize = parse_var(&lookup, "BRANCH_MAX_DEPTH", branch_defaults.max_depth)?;
        if max_depth > MAX_DEPTH_CEILING {
            return Err(invalid(
                "BRANCH_MAX_DEPTH",
                &max_depth.to_string(),
                &format!("must be at most {}", MAX_DEPTH_CEILING),
            ));
        }
        let timeout_ms: u64 = parse_var(
            &lookup,
            "BRANCH_TIMEOUT_MS",
            branch_defaults.timeout.as_millis() as u64,
        )?;
        if timeout_ms == 0 {
            return Err(invalid("BRANCH_TIMEOUT_MS", "0", "must be greater than 0"));
        }

        let delete_policy: DeletePolicy =
            parse_var(&lookup, "DELETE_POLICY", DeletePolicy::default())?;
        let empty_result_policy =
            parse_var(&lookup, "EMPTY_RESULT_POLICY", defaults.empty_result_policy)?;

        let legacy_routes = match lookup("LEGACY_ROUTES") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| invalid("LEGACY_ROUTES", &value, "expected true or false"))?,
            None => defaults.legacy_routes,
        };

        let cors_allow_origin = match lookup("CORS_ALLOW_ORIGIN") {
            Some(origin) if !origin.trim().is_empty() => {
                HeaderValue::from_str(&origin).map_err(|e| {
                    invalid("CORS_ALLOW_ORIGIN", &origin, &e.to_string())
                })?;
                Some(origin)
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            database_path,
            service: NodeServiceConfig {
                delete_policy,
                branch: BranchConfig {
                    strategy,
                    max_depth,
                    timeout: Duration::from_millis(timeout_ms),
                },
            },
            empty_result_policy,
            legacy_routes,
            cors_allow_origin,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &value, &e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
