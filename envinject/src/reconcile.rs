//! Computes the patch that brings every container's `env` in line with the desired list.
//!
//! After the patch is applied, desired entry `i` sits at position `i` of each container's `env`.
//! Entries already set by the user keep their value; the desired value is only used when the
//! name is missing. Entries outside the desired list keep their relative order after the desired
//! ones.

use json_patch::PatchOperation;
use k8s_openapi::api::core::v1::{Container, EnvVar, Pod};

use crate::patch::{self, ContainerList, ContainerRef, RepositionStrategy};

/// Reconcile the `env` of one container against `desired`.
///
/// Desired entries are placed in ascending order. While placing entry `i`, the document is
/// `desired[..i]` followed by the entries not yet matched, in their original order. An entry
/// found at `pos` among those unmatched entries therefore sits at `i + pos` in the document.
pub fn reconcile(
    container: &ContainerRef,
    existing: &[EnvVar],
    desired: &[EnvVar],
    strategy: RepositionStrategy,
) -> Vec<PatchOperation> {
    let mut patches = Vec::new();

    if existing.is_empty() && !desired.is_empty() {
        patches.push(patch::create_env(container));
    }

    let mut remaining: Vec<&EnvVar> = existing.iter().collect();

    for (target, def) in desired.iter().enumerate() {
        match remaining.iter().position(|env| env.name == def.name) {
            Some(pos) => {
                let current = target + pos;
                if current != target {
                    tracing::trace!(
                        "Repositioning {} in {:?} from {} to {}",
                        def.name,
                        container,
                        current,
                        target
                    );
                    patches.extend(patch::reposition_env(
                        container,
                        current,
                        target,
                        remaining[pos],
                        strategy,
                    ));
                }
                remaining.remove(pos);
            }
            None => {
                tracing::trace!("Inserting {} in {:?} at {}", def.name, container, target);
                patches.push(patch::insert_env(container, target, def));
            }
        }
    }

    patches
}

/// Reconcile every init container and container of `pod`, in that order.
///
/// Returns an empty vector when every container is already in the desired shape.
pub fn mutate_pod(
    pod: &Pod,
    desired: &[EnvVar],
    strategy: RepositionStrategy,
) -> Vec<PatchOperation> {
    let Some(spec) = pod.spec.as_ref() else {
        return Vec::new();
    };

    let lists: [(ContainerList, &[Container]); 2] = [
        (
            ContainerList::InitContainers,
            spec.init_containers.as_deref().unwrap_or_default(),
        ),
        (ContainerList::Containers, spec.containers.as_slice()),
    ];

    let mut patches = Vec::new();
    for (list, containers) in lists {
        for (index, container) in containers.iter().enumerate() {
            let existing = container.env.as_deref().unwrap_or_default();
            let ops = reconcile(&ContainerRef::new(list, index), existing, desired, strategy);
            tracing::debug!(
                "Container {:?} ({}) needs {} patch operations",
                container.name,
                list.field(),
                ops.len()
            );
            patches.extend(ops);
        }
    }

    patches
}
