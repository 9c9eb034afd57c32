// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration.
//!
//! Environment variables are read once at startup into immutable records
//! that are passed explicitly down the call graph. Each binary fails fast
//! with the name of the first missing variable.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).ok().filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}

/// Deployment environment, from `POIESIS_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnv {
    #[default]
    Development,
    Production,
}

crate::simple_display! {
    RuntimeEnv {
        Development => "development",
        Production => "production",
    }
}

/// Which authenticator the API uses, from `AUTH_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthKind {
    #[default]
    Dummy,
    Oidc,
}

/// Configuration shared by every workload.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub env: RuntimeEnv,
    /// Kubernetes namespace all task resources live in.
    pub namespace: String,
    pub service_account: String,
    /// Image the engine's own workloads (orchestrator, filers, monitor) run.
    pub image: String,
    pub image_pull_policy: String,
    pub restart_policy: String,
    /// Seconds a finished Job lingers before the cluster reaps it.
    pub job_ttl_seconds: i32,
    pub pvc_access_mode: String,
    pub pvc_storage_class: Option<String>,
    /// Per-step wall-clock limit for bus waits and executor pods.
    /// `None` means wait forever (`MONITOR_TIMEOUT_SECONDS=0`).
    pub monitor_timeout: Option<Duration>,
    /// ConfigMap holding the engine's own environment, mounted into
    /// child workloads via `envFrom`.
    pub core_configmap: String,
    pub mongo_secret: Option<String>,
    pub redis_secret: Option<String>,
    pub s3_secret: Option<String>,
    pub infra_security_context: bool,
    pub executor_security_context: bool,
    /// Mount path of the security-context ConfigMap, when enabled.
    pub security_context_path: Option<String>,
}

impl CoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = match optional("POIESIS_ENV").as_deref() {
            None | Some("development") | Some("dev") => RuntimeEnv::Development,
            Some("production") | Some("prod") => RuntimeEnv::Production,
            Some(other) => {
                return Err(ConfigError::Invalid { name: "POIESIS_ENV", value: other.to_string() })
            }
        };
        let monitor_timeout = match parsed::<u64>("MONITOR_TIMEOUT_SECONDS", default_timeout(env))?
        {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(Self {
            env,
            namespace: optional("POIESIS_K8S_NAMESPACE").unwrap_or_else(|| "poiesis".to_string()),
            service_account: optional("POIESIS_SERVICE_ACCOUNT_NAME")
                .unwrap_or_else(|| "poiesis-sa".to_string()),
            image: required("POIESIS_IMAGE")?,
            image_pull_policy: optional("POIESIS_IMAGE_PULL_POLICY")
                .unwrap_or_else(|| "IfNotPresent".to_string()),
            restart_policy: optional("POIESIS_RESTART_POLICY")
                .unwrap_or_else(|| "Never".to_string()),
            job_ttl_seconds: parsed("POIESIS_JOB_TTL", 300)?,
            pvc_access_mode: optional("POIESIS_PVC_ACCESS_MODE")
                .unwrap_or_else(|| "ReadWriteOnce".to_string()),
            pvc_storage_class: optional("POIESIS_PVC_STORAGE_CLASS"),
            monitor_timeout,
            core_configmap: optional("POIESIS_CORE_CONFIGMAP_NAME")
                .unwrap_or_else(|| "poiesis-core".to_string()),
            mongo_secret: optional("POIESIS_MONGO_SECRET_NAME"),
            redis_secret: optional("POIESIS_REDIS_SECRET_NAME"),
            s3_secret: optional("POIESIS_S3_SECRET_NAME"),
            infra_security_context: flag(
                "POIESIS_INFRASTRUCTURE_SECURITY_CONTEXT_ENABLED",
                false,
            )?,
            executor_security_context: flag("POIESIS_EXECUTOR_SECURITY_CONTEXT_ENABLED", false)?,
            security_context_path: optional("POIESIS_SECURITY_CONTEXT_PATH"),
        })
    }
}

/// Development defaults to a short wait so a broken bus is caught in
/// seconds; production waits forever and relies on store reconciliation.
fn default_timeout(env: RuntimeEnv) -> u64 {
    match env {
        RuntimeEnv::Development => 30,
        RuntimeEnv::Production => 0,
    }
}

/// API-server-only configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub auth: AuthKind,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth = match optional("AUTH_TYPE").as_deref() {
            None | Some("dummy") => AuthKind::Dummy,
            Some("oidc") => AuthKind::Oidc,
            Some(other) => {
                return Err(ConfigError::Invalid { name: "AUTH_TYPE", value: other.to_string() })
            }
        };
        Ok(Self { port: parsed("POIESIS_API_SERVER_PORT", 8000)?, auth })
    }
}

/// Document-store connection settings.
#[derive(Clone)]
pub struct MongoConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: u32,
}

impl MongoConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional("MONGODB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parsed("MONGODB_PORT", 27017)?,
            user: required("MONGODB_USER")?,
            password: required("MONGODB_PASSWORD")?,
            database: optional("MONGODB_DATABASE").unwrap_or_else(|| "poiesis".to_string()),
            max_pool_size: parsed("MONGODB_MAX_POOL_SIZE", 10)?,
        })
    }

    pub fn connection_uri(&self) -> String {
        format!("mongodb://{}:{}@{}:{}", self.user, self.password, self.host, self.port)
    }
}

impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_pool_size", &self.max_pool_size)
            .finish()
    }
}

/// Message-broker connection settings.
#[derive(Clone)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl BusConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional("MESSAGE_BROKER_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parsed("MESSAGE_BROKER_PORT", 6379)?,
            password: optional("MESSAGE_BROKER_PASSWORD"),
        })
    }

    pub fn connection_uri(&self) -> String {
        match &self.password {
            Some(pw) => format!("redis://:{}@{}:{}", pw, self.host, self.port),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }
}

impl std::fmt::Debug for BusConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Object-store connection settings.
#[derive(Clone)]
pub struct S3Config {
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
    /// Bucket-in-path addressing, required by most non-AWS endpoints.
    pub path_style: bool,
}

impl S3Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: required("S3_URL")?,
            access_key: required("AWS_ACCESS_KEY_ID")?,
            secret_key: required("AWS_SECRET_ACCESS_KEY")?,
            path_style: flag("S3_PATH_STYLE", true)?,
        })
    }
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("url", &self.url)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("path_style", &self.path_style)
            .finish()
    }
}

/// OIDC verification settings.
#[derive(Clone)]
pub struct OidcConfig {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl OidcConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            issuer: required("OIDC_ISSUER")?,
            client_id: required("OIDC_CLIENT_ID")?,
            client_secret: optional("OIDC_CLIENT_SECRET"),
        })
    }
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
