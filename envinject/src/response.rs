//! Turns a patch into an admission decision.

use json_patch::{Patch, PatchOperation};
use kube::core::admission::{AdmissionResponse, SerializePatchError};

/// The verdict for a single admission request. Requests are never denied here.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Allow the object unchanged.
    Allow,
    /// Allow the object once the patch is applied.
    AllowWithPatch(Patch),
}

impl Decision {
    pub fn patch(&self) -> Option<&Patch> {
        match self {
            Decision::Allow => None,
            Decision::AllowWithPatch(patch) => Some(patch),
        }
    }

    /// Write the decision into `response`, which should already carry the request's UID.
    /// A patch is serialized as a `JSONPatch`.
    pub fn into_response(
        self,
        response: AdmissionResponse,
    ) -> Result<AdmissionResponse, SerializePatchError> {
        match self {
            Decision::Allow => Ok(response),
            Decision::AllowWithPatch(patch) => response.with_patch(patch),
        }
    }
}

/// Allow without a patch when `patches` is empty, otherwise allow with the patch.
pub fn assemble(patches: Vec<PatchOperation>) -> Decision {
    if patches.is_empty() {
        return Decision::Allow;
    }

    tracing::debug!("Mutating JSON patch: {:?}", patches);
    Decision::AllowWithPatch(Patch(patches))
}
