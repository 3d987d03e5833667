/// Configuration management for xks
///
/// Required values come from the environment, optionally backed by a YAML
/// file. Environment variables always win over the file.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::XksError;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_PATH: &str = "xks.yaml";

pub const ENV_TENANT_ID: &str = "AZURE_TENANTID";
pub const ENV_APP_ID: &str = "AZURE_APPID";
pub const ENV_SECRET_ID: &str = "AZURE_SECRETID";
pub const ENV_SUBSCRIPTION: &str = "AZURE_SUBSCRIPTION";
pub const ENV_RESOURCE_GROUP: &str = "AKS_RESOURCE_NAME";
pub const ENV_CLUSTER_NAME: &str = "AKS_NAME";

/// Who we log in as and which cluster we talk to
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterIdentity {
    pub tenant_id: String,
    pub app_id: String,
    pub secret: String,
    pub subscription: String,
    pub resource_group: String,
    pub cluster_name: String,
}

impl fmt::Debug for ClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterIdentity")
            .field("tenant_id", &self.tenant_id)
            .field("app_id", &self.app_id)
            .field("secret", &"****")
            .field("subscription", &self.subscription)
            .field("resource_group", &self.resource_group)
            .field("cluster_name", &self.cluster_name)
            .finish()
    }
}

/// Per-call deadlines, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Authentication probe
    pub probe: u64,
    pub login: u64,
    /// Each of the two cluster setup steps
    pub setup: u64,
    /// Power state query
    pub status: u64,
    /// Cluster start and stop
    pub lifecycle: u64,
    /// Remote command execution
    pub command: u64,
    /// Fetching the result of a no-wait command
    pub result: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: 10,
            login: 30,
            setup: 30,
            status: 30,
            lifecycle: 600,
            command: 300,
            result: 30,
        }
    }
}

impl Timeouts {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status)
    }

    pub fn lifecycle_timeout(&self) -> Duration {
        Duration::from_secs(self.lifecycle)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command)
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_secs(self.result)
    }
}

/// On-disk configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Azure AD tenant (AZURE_TENANTID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Service principal application id (AZURE_APPID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Service principal secret (AZURE_SECRETID), prefer the environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Subscription id or name (AZURE_SUBSCRIPTION)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,

    /// Resource group holding the cluster (AKS_RESOURCE_NAME)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,

    /// AKS cluster name (AKS_NAME)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,

    /// Azure CLI executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub az_binary: Option<String>,

    pub timeouts: Timeouts,
}

impl FileConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, XksError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| XksError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| XksError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            tenant_id: Some("00000000-0000-0000-0000-000000000000".to_string()),
            app_id: Some("00000000-0000-0000-0000-000000000000".to_string()),
            secret: None,
            subscription: Some("my-subscription".to_string()),
            resource_group: Some("my-resource-group".to_string()),
            cluster_name: Some("my-private-aks".to_string()),
            az_binary: None,
            timeouts: Timeouts::default(),
        }
    }
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct XksConfig {
    pub identity: ClusterIdentity,
    pub timeouts: Timeouts,
    pub az_binary: String,
}

impl XksConfig {
    /// Resolve from the process environment and an optional config file
    ///
    /// An explicit path must be readable. Without one, `xks.yaml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, XksError> {
        let file = match path {
            Some(path) => FileConfig::from_file(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    FileConfig::from_file(&default_path)?
                } else {
                    FileConfig::default()
                }
            }
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge file values with an environment lookup, failing on the first
    /// required value that is missing or empty
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self, XksError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &'static str, from_file: Option<String>| -> Result<String, XksError> {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| from_file.filter(|v| !v.trim().is_empty()))
                .ok_or(XksError::Configuration { key })
        };

        let identity = ClusterIdentity {
            tenant_id: pick(ENV_TENANT_ID, file.tenant_id)?,
            app_id: pick(ENV_APP_ID, file.app_id)?,
            secret: pick(ENV_SECRET_ID, file.secret)?,
            subscription: pick(ENV_SUBSCRIPTION, file.subscription)?,
            resource_group: pick(ENV_RESOURCE_GROUP, file.resource_group)?,
            cluster_name: pick(ENV_CLUSTER_NAME, file.cluster_name)?,
        };

        Ok(Self {
            identity,
            timeouts: file.timeouts,
            az_binary: file.az_binary.unwrap_or_else(|| "az".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        [
            (ENV_TENANT_ID, "tenant"),
            (ENV_APP_ID, "app"),
            (ENV_SECRET_ID, "secret"),
            (ENV_SUBSCRIPTION, "sub"),
            (ENV_RESOURCE_GROUP, "rg"),
            (ENV_CLUSTER_NAME, "aks"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    #[test]
    fn test_resolve_from_env() {
        let env = full_env();
        let config = XksConfig::resolve(FileConfig::default(), |k| env.get(k).cloned()).unwrap();

        assert_eq!(config.identity.tenant_id, "tenant");
        assert_eq!(config.identity.cluster_name, "aks");
        assert_eq!(config.az_binary, "az");
        assert_eq!(config.timeouts, Timeouts::default());
    }

    #[test]
    fn test_first_missing_value_is_named() {
        let mut env = full_env();
        env.remove(ENV_SUBSCRIPTION);
        env.remove(ENV_CLUSTER_NAME);

        let err = XksConfig::resolve(FileConfig::default(), |k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(
            err,
            XksError::Configuration {
                key: ENV_SUBSCRIPTION
            }
        ));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert(ENV_TENANT_ID, "  ".to_string());

        let err = XksConfig::resolve(FileConfig::default(), |k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, XksError::Configuration { key: ENV_TENANT_ID }));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut env = full_env();
        env.remove(ENV_RESOURCE_GROUP);
        env.insert(ENV_CLUSTER_NAME, "from-env".to_string());

        let file = FileConfig {
            resource_group: Some("from-file-rg".to_string()),
            cluster_name: Some("from-file".to_string()),
            az_binary: Some("/opt/az/bin/az".to_string()),
            ..FileConfig::default()
        };

        let config = XksConfig::resolve(file, |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.identity.resource_group, "from-file-rg");
        assert_eq!(config.identity.cluster_name, "from-env");
        assert_eq!(config.az_binary, "/opt/az/bin/az");
    }

    #[test]
    fn test_from_file_with_partial_timeouts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xks.yaml");
        std::fs::write(
            &path,
            "cluster_name: private-aks\ntimeouts:\n  lifecycle: 1200\n",
        )
        .unwrap();

        let file = FileConfig::from_file(&path).unwrap();
        assert_eq!(file.cluster_name.as_deref(), Some("private-aks"));
        assert_eq!(file.timeouts.lifecycle, 1200);
        assert_eq!(file.timeouts.probe, 10);
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = FileConfig::from_file(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, XksError::ConfigRead { .. }));

        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "timeouts: [1, 2").unwrap();
        let bad = FileConfig::from_file(&path).unwrap_err();
        assert!(matches!(bad, XksError::ConfigParse { .. }));
    }

    #[test]
    fn test_example_omits_secret() {
        let yaml = serde_yaml::to_string(&FileConfig::example()).unwrap();
        assert!(!yaml.contains("secret"));
        assert!(yaml.contains("cluster_name"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let env = full_env();
        let config = XksConfig::resolve(FileConfig::default(), |k| env.get(k).cloned()).unwrap();
        let debug = format!("{:?}", config.identity);
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("****"));
    }
}
