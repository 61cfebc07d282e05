//! The ordered list of environment variables every container must end up with.

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};

use crate::k8s::consts;

/// Build an entry whose value is read from a field of the pod at runtime.
pub fn field_ref_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: None,
                field_path: field_path.to_string(),
            }),
            ..Default::default()
        }),
    }
}

/// Build an entry with a literal value.
pub fn literal_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

/// The built-in desired list, used when no other list is configured.
///
/// Position in the list is the position the entry must occupy in every container's `env`.
pub fn default_env() -> Vec<EnvVar> {
    vec![
        field_ref_env(consts::ENV_AGENT_HOST, consts::FIELD_PATH_HOST_IP),
        literal_env(consts::ENV_DEV_VERSION, consts::DEV_VERSION),
    ]
}

/// Return the name of the first entry whose name appears earlier in `env`, if any.
pub fn find_duplicate(env: &[EnvVar]) -> Option<&str> {
    env.iter().enumerate().find_map(|(i, entry)| {
        env[..i]
            .iter()
            .any(|seen| seen.name == entry.name)
            .then_some(entry.name.as_str())
    })
}
