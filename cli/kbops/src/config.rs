//! Operation configuration.
//!
//! Namespace, cluster definition, component sizing and poll timings live in
//! `OpsConfig` so tests can inject their own values. `OpsConfig::from_env` overlays `KB_*`
//! environment variables on the defaults.

use crate::error::OpsError;
use crds::TerminationPolicy;
use std::env;
use std::time::Duration;

/// Namespace used when `KB_NAMESPACE` is not set
pub const DEFAULT_NAMESPACE: &str = "demo";

/// Tick interval and overall deadline for one poll run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between reads; the first read happens one interval in
    pub interval: Duration,
    /// Budget for submission plus polling, measured from ticker creation
    pub deadline: Duration,
}

impl PollSettings {
    /// Settings ticking every `interval` until `deadline` has passed
    pub const fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

/// Sizing of the single managed component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentTemplate {
    /// Component name inside the cluster; also the component that gets scaled
    pub name: String,
    pub service_version: String,
    /// Replica count a new cluster starts with
    pub replicas: i32,
    pub cpu_request: String,
    pub memory_request: String,
    pub cpu_limit: String,
    pub memory_limit: String,
    /// Size of the `data` volume claim
    pub storage_size: String,
    pub disable_exporter: bool,
}

impl Default for ComponentTemplate {
    fn default() -> Self {
        Self {
            name: "postgresql".to_string(),
            service_version: "14.7.2".to_string(),
            replicas: 1,
            cpu_request: "0.5".to_string(),
            memory_request: "1Gi".to_string(),
            cpu_limit: "1".to_string(),
            memory_limit: "1Gi".to_string(),
            storage_size: "10Gi".to_string(),
            disable_exporter: false,
        }
    }
}

/// Configuration shared by the create, delete and scale operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpsConfig {
    pub namespace: String,
    pub cluster_definition: String,
    pub topology: String,
    pub termination_policy: TerminationPolicy,
    pub component: ComponentTemplate,
    /// 5s ticks, 30 minute deadline
    pub create_poll: PollSettings,
    /// 2s ticks, 5 minute deadline
    pub delete_poll: PollSettings,
    /// 5s ticks, 30 minute deadline
    pub scale_poll: PollSettings,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            cluster_definition: "postgresql".to_string(),
            topology: "replication".to_string(),
            termination_policy: TerminationPolicy::WipeOut,
            component: ComponentTemplate::default(),
            create_poll: PollSettings::new(Duration::from_secs(5), Duration::from_secs(30 * 60)),
            delete_poll: PollSettings::new(Duration::from_secs(2), Duration::from_secs(5 * 60)),
            scale_poll: PollSettings::new(Duration::from_secs(5), Duration::from_secs(30 * 60)),
        }
    }
}

impl OpsConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, OpsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults
    ///
    /// Recognised keys: `KB_NAMESPACE`, `KB_CLUSTER_DEFINITION`,
    /// `KB_TOPOLOGY`, `KB_COMPONENT`, `KB_SERVICE_VERSION`,
    /// `KB_STORAGE_SIZE`, `KB_TERMINATION_POLICY`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OpsError> {
        let mut config = Self::default();
        let get = |key: &str| -> Result<Option<String>, OpsError> {
            match lookup(key) {
                None => Ok(None),
                Some(v) if v.trim().is_empty() => Err(OpsError::InvalidConfig(format!(
                    "{} is set but empty",
                    key
                ))),
                Some(v) => Ok(Some(v.trim().to_string())),
            }
        };

        if let Some(v) = get("KB_NAMESPACE")? {
            config.namespace = v;
        }
        if let Some(v) = get("KB_CLUSTER_DEFINITION")? {
            config.cluster_definition = v;
        }
        if let Some(v) = get("KB_TOPOLOGY")? {
            config.topology = v;
        }
        if let Some(v) = get("KB_COMPONENT")? {
            config.component.name = v;
        }
        if let Some(v) = get("KB_SERVICE_VERSION")? {
            config.component.service_version = v;
        }
        if let Some(v) = get("KB_STORAGE_SIZE")? {
            config.component.storage_size = v;
        }
        if let Some(v) = get("KB_TERMINATION_POLICY")? {
            config.termination_policy = parse_termination_policy(&v)?;
        }

        Ok(config)
    }
}

fn parse_termination_policy(value: &str) -> Result<TerminationPolicy, OpsError> {
    match value {
        "DoNotTerminate" => Ok(TerminationPolicy::DoNotTerminate),
        "Delete" => Ok(TerminationPolicy::Delete),
        "WipeOut" => Ok(TerminationPolicy::WipeOut),
        other => Err(OpsError::InvalidConfig(format!(
            "KB_TERMINATION_POLICY must be DoNotTerminate, Delete or WipeOut, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OpsConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, OpsConfig::default());
        assert_eq!(config.namespace, "demo");
        assert_eq!(config.create_poll.interval, Duration::from_secs(5));
        assert_eq!(config.create_poll.deadline, Duration::from_secs(1800));
        assert_eq!(config.delete_poll.interval, Duration::from_secs(2));
        assert_eq!(config.delete_poll.deadline, Duration::from_secs(300));
        assert_eq!(config.scale_poll, config.create_poll);
    }

    #[test]
    fn test_env_overrides() {
        let config = OpsConfig::from_lookup(lookup_from(&[
            ("KB_NAMESPACE", "staging"),
            ("KB_COMPONENT", "mysql"),
            ("KB_STORAGE_SIZE", " 20Gi "),
            ("KB_TERMINATION_POLICY", "Delete"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "staging");
        assert_eq!(config.component.name, "mysql");
        assert_eq!(config.component.storage_size, "20Gi");
        assert_eq!(config.termination_policy, TerminationPolicy::Delete);
        assert_eq!(config.cluster_definition, "postgresql");
    }

    #[test]
    fn test_empty_value_rejected() {
        let err = OpsConfig::from_lookup(lookup_from(&[("KB_NAMESPACE", "  ")])).unwrap_err();
        assert!(matches!(err, OpsError::InvalidConfig(_)));
    }

    #[test]
    fn test_bad_termination_policy_rejected() {
        let err = OpsConfig::from_lookup(lookup_from(&[("KB_TERMINATION_POLICY", "Halt")]))
            .unwrap_err();
        assert!(err.to_string().contains("Halt"));
    }
}
