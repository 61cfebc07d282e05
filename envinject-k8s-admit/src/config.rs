//! This module defines the configuration file.

use std::{fs, path::Path};

use anyhow::{anyhow, Context};
use envinject::{desired, patch::RepositionStrategy};
use k8s_openapi::api::core::v1::EnvVar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub selectors: Option<Selectors>,
    /// How entries already present at the wrong position are moved.
    #[serde(default)]
    pub reposition_strategy: RepositionStrategy,
    /// The ordered list of variables to inject. The built-in list is used when it is not set.
    #[serde(default)]
    pub env: Option<Vec<EnvVar>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
/// The LabelSelector struct is used to match pod labels.
/// It is a reduced version of the Kubernetes LabelSelector, as we only support matching labels. Expressions are not supported.
pub struct LabelSelector {
    #[serde(rename = "matchLabels")]
    pub match_labels: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Selectors {
    pub include: Option<LabelSelector>,
    pub exclude: Option<LabelSelector>,
}

impl Config {
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        if let Some(name) = config.env.as_deref().and_then(desired::find_duplicate) {
            return Err(anyhow!("Environment variable {} is listed more than once", name));
        }
        Ok(config)
    }

    pub fn from_file(file_path: &Path) -> anyhow::Result<Self> {
        let config_content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        Self::from_str(&config_content)
    }

    /// The variables every container must end up with, in order.
    pub fn desired_env(&self) -> Vec<EnvVar> {
        self.env.clone().unwrap_or_else(desired::default_env)
    }
}

#[cfg(test)]
mod tests {
    use envinject::desired::{default_env, field_ref_env, literal_env};

    use super::*;

    #[test]
    fn test_config_load() {
        let config = Config::from_str(
            r#"
            selectors:
              exclude:
                matchLabels:
                  envinject.io/disabled: "true"
            repositionStrategy: nativeMove
            env:
              - name: DD_AGENT_HOST
                valueFrom:
                  fieldRef:
                    fieldPath: status.hostIP
              - name: DD_ENV
                value: staging
        "#,
        )
        .unwrap();

        let selectors = config.selectors.clone().unwrap();

        assert!(selectors.include.is_none());
        assert_eq!(
            selectors
                .exclude
                .unwrap()
                .match_labels
                .get("envinject.io/disabled")
                .unwrap(),
            "true"
        );
        assert_eq!(config.reposition_strategy, RepositionStrategy::NativeMove);
        assert_eq!(
            config.desired_env(),
            vec![
                field_ref_env("DD_AGENT_HOST", "status.hostIP"),
                literal_env("DD_ENV", "staging"),
            ]
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_str("{}").unwrap();

        assert!(config.selectors.is_none());
        assert_eq!(config.reposition_strategy, RepositionStrategy::RemoveThenAdd);
        assert_eq!(config.desired_env(), default_env());
    }

    #[test]
    fn test_config_duplicate_env() {
        let err = Config::from_str(
            r#"
            env:
              - name: DD_ENV
                value: staging
              - name: DD_ENV
                value: prod
        "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("DD_ENV"));
    }

    #[test]
    fn test_config_unknown_strategy() {
        assert!(Config::from_str("repositionStrategy: teleport").is_err());
    }
}
