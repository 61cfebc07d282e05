//! JSON patch operations against the `env` of a single container.
//!
//! Operations are applied in order, each one against the document left by the previous ones,
//! so the indices produced here are only meaningful within the sequence that contains them.

use json_patch::{AddOperation, MoveOperation, PatchOperation, RemoveOperation};
use jsonptr::{Pointer, Token};
use k8s_openapi::api::core::v1::EnvVar;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::k8s::consts;

/// The pod spec arrays that hold containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerList {
    InitContainers,
    Containers,
}

impl ContainerList {
    pub fn field(&self) -> &'static str {
        match self {
            ContainerList::InitContainers => consts::FIELD_INIT_CONTAINERS,
            ContainerList::Containers => consts::FIELD_CONTAINERS,
        }
    }
}

/// Locates a container inside the pod spec: `/spec/<list>/<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRef {
    pub list: ContainerList,
    pub index: usize,
}

impl ContainerRef {
    pub fn new(list: ContainerList, index: usize) -> Self {
        Self { list, index }
    }

    /// `/spec/<list>/<index>/env`
    pub fn env_pointer(&self) -> Pointer {
        Pointer::new([
            "spec".to_string(),
            self.list.field().to_string(),
            self.index.to_string(),
            consts::FIELD_ENV.to_string(),
        ])
    }

    /// `/spec/<list>/<index>/env/<position>`
    pub fn env_entry_pointer(&self, position: usize) -> Pointer {
        let mut pointer = self.env_pointer();
        pointer.push_back(Token::from(position.to_string()));
        pointer
    }
}

/// How an existing entry is brought to its target position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepositionStrategy {
    /// A single `move` operation.
    NativeMove,
    /// A `remove` of the entry followed by an `add` of the same entry at the target.
    ///
    /// Older json-patch consumers (evanphx/json-patch before v4.2.0, shipped with Kubernetes
    /// before 1.14.3) corrupt arrays on `move`, so this is the default.
    #[default]
    RemoveThenAdd,
}

/// `add` of `value` at `path`.
pub fn add(path: Pointer, value: serde_json::Value) -> PatchOperation {
    PatchOperation::Add(AddOperation { path, value })
}

/// `remove` of whatever is at `path`.
pub fn remove(path: Pointer) -> PatchOperation {
    PatchOperation::Remove(RemoveOperation { path })
}

/// Create an empty `env` array on the container. The field may be missing from the pod.
pub fn create_env(container: &ContainerRef) -> PatchOperation {
    add(container.env_pointer(), json!([]))
}

/// Insert `entry` so that it ends up at `position`.
pub fn insert_env(container: &ContainerRef, position: usize, entry: &EnvVar) -> PatchOperation {
    // EnvVar has only string keys and string leaves, it always maps to a JSON object.
    let value = serde_json::to_value(entry).expect("EnvVar serializes to JSON");
    add(container.env_entry_pointer(position), value)
}

/// Bring `entry`, currently at `from`, to position `to`.
pub fn reposition_env(
    container: &ContainerRef,
    from: usize,
    to: usize,
    entry: &EnvVar,
    strategy: RepositionStrategy,
) -> Vec<PatchOperation> {
    match strategy {
        RepositionStrategy::NativeMove => vec![PatchOperation::Move(MoveOperation {
            from: container.env_entry_pointer(from),
            path: container.env_entry_pointer(to),
        })],
        RepositionStrategy::RemoveThenAdd => vec![
            remove(container.env_entry_pointer(from)),
            insert_env(container, to, entry),
        ],
    }
}
