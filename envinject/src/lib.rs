//! Environment injection for pods admitted into the cluster.
//!
//! Given a pod, [`reconcile::mutate_pod`] computes the JSON patch that places a fixed, ordered
//! list of environment variables at the front of every container's `env`, and
//! [`response::assemble`] turns that patch into an admission decision.
pub mod desired;
pub mod k8s;
pub mod patch;
pub mod reconcile;
pub mod response;
