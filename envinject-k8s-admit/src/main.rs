/// The admission controller injects the required environment variables into incoming pods
use std::{
    convert::Infallible,
    future::Future,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use clap::Parser;
use config::Config;
use envinject::{reconcile::mutate_pod, response::assemble};
use k8s_openapi::api::core::v1::Pod;
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    DynamicObject, GroupVersionResource,
};
use tracing::{info, Level};
use warp::Filter;

mod config;

/// The path the API server posts admission reviews to.
pub const WEBHOOK_PATH: &str = "application-mutating-webhook";

/// Perform the label selector logic to determine if the pod should be selected.
/// matchLabels is a map of {key,value} pairs. A single {key,value} in the matchLabels map is equivalent to an element of matchExpressions, whose key field is "key", the operator is "In", and the values array contains only "value". The requirements are ANDed.
pub(self) fn run_match_labels(
    labels: &std::collections::BTreeMap<String, String>,
    match_labels: &std::collections::BTreeMap<String, String>,
) -> bool {
    match_labels
        .iter()
        .all(|(key, value)| labels.get(key).map_or(false, |v| v == value))
}

fn should_inject(pod: &Pod, config: &Config) -> bool {
    match &config.selectors {
        Some(selectors) => {
            let pod_labels = pod.metadata.labels.clone().unwrap_or_default();

            // If include is set, we only inject into pods that match the labels.
            if let Some(include) = &selectors.include {
                if !run_match_labels(&pod_labels, &include.match_labels) {
                    return false;
                }
            }

            // Exclude takes precedence over include.
            if let Some(exclude) = &selectors.exclude {
                if run_match_labels(&pod_labels, &exclude.match_labels) {
                    return false;
                }
            }

            true
        }
        None => true,
    }
}

/// Only core/v1 pods are mutated.
fn is_pod_resource(resource: &GroupVersionResource) -> bool {
    resource.group.is_empty() && resource.version == "v1" && resource.resource == "pods"
}

/// This function is responsible for handling the admission of pods.
///
/// Any other resource is allowed unchanged: the webhook fails open on kinds it does not know,
/// so a misconfigured webhook registration never blocks unrelated objects.
fn admission_handler(
    req: &AdmissionRequest<DynamicObject>,
    config: &Config,
) -> anyhow::Result<AdmissionResponse> {
    if !is_pod_resource(&req.resource) {
        tracing::warn!(
            "Expected resource to be v1 pods, got {:?}; allowing unchanged",
            req.resource
        );
        return Ok(AdmissionResponse::from(req));
    }

    // Extract the Pod from the request
    let pod: Pod = req
        .object
        .clone()
        .ok_or(anyhow!("No object in request"))?
        .try_parse()
        .context("Could not retrieve Pod from request")?;

    tracing::debug!(
        "Pod: {:?} namespace={:?}",
        pod.metadata.name,
        pod.metadata.namespace
    );

    if !should_inject(&pod, config) {
        tracing::trace!(
            "Skipping pod {:?} because it does not match the selectors",
            pod.metadata.name
        );
        return Ok(AdmissionResponse::from(req));
    }

    let patches = mutate_pod(&pod, &config.desired_env(), config.reposition_strategy);
    let decision = assemble(patches);

    match decision.patch() {
        Some(patch) => tracing::info!(
            "Mutating a Pod: {:?} in namespace={:?} with patch {:?}",
            pod.metadata.name,
            pod.metadata.namespace,
            patch
        ),
        None => tracing::debug!(
            "Pod {:?} in namespace={:?} already has the required environment",
            pod.metadata.name,
            pod.metadata.namespace
        ),
    }

    let response = decision.into_response(AdmissionResponse::from(req))?;

    tracing::debug!("Admission Handler response {:?}", response);

    Ok(response)
}

/// Load the configuration and run the handler.
///
/// Errors after the request is parsed deny the object and keep the request's UID and API
/// version. Only a review without a usable request is answered with `invalid`.
fn review(body: AdmissionReview<DynamicObject>, config_file: &Path) -> AdmissionReview<DynamicObject> {
    tracing::trace!("Admission Handler request {:?}", body);

    // Parse incoming webhook AdmissionRequest first
    let req: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(req) => req,
        Err(err) => {
            tracing::error!("Invalid admission review: {:?}", err);
            return AdmissionResponse::invalid(err.to_string()).into_review();
        }
    };

    // Load the configuration file on every request to allow for hot-reloading of the configuration.
    let result = Config::from_file(config_file)
        .context("Failed to load configuration file")
        .and_then(|config| admission_handler(&req, &config));

    match result {
        Ok(response) => response.into_review(),
        Err(err) => {
            tracing::error!("Error: {:?}", err);
            AdmissionResponse::from(&req)
                .deny(format!("{err:#}"))
                .into_review()
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "envinject-k8s-admit")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[arg(short, long)]
    /// Path to the configuration file.
    config_file: PathBuf,
    /// The path to the TLS certificate.
    #[arg(long)]
    tls_cert: PathBuf,
    /// The path to the TLS key.
    #[arg(long)]
    tls_key: PathBuf,
    /// The port to listen on.
    /// Default is 3030.
    #[arg(short, long, default_value = "3030")]
    port: u16,
    /// The maximum level of the logs written to stdout.
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn webhook_task(
    tls_cert: &Path,
    tls_key: &Path,
    port: u16,
    config_file: PathBuf,
) -> impl Future<Output = ()> + 'static {
    let mutate = warp::path(WEBHOOK_PATH)
        .and(warp::body::json())
        .and_then(move |body: AdmissionReview<DynamicObject>| {
            let config_file = config_file.clone();
            async move {
                Ok::<warp::reply::Json, Infallible>(warp::reply::json(&review(body, &config_file)))
            }
        })
        .with(warp::trace::request());

    info!("Starting webhook server on port {}", port);
    let (_addr, fut) = warp::serve(warp::post().and(mutate))
        .tls()
        .cert_path(tls_cert)
        .key_path(tls_key)
        .bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for CTRL+C: {:?}", err);
            }
        });
    fut
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse the CLI arguments
    let args = Args::try_parse()?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        // all spans/events with a level higher than the requested one will be written to stdout.
        .with_max_level(args.log_level)
        // builds the subscriber.
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Parsed CLI arguments: {:?}", args);

    // Load the configuration file to validate it.
    let config =
        Config::from_file(&args.config_file).context("Failed to load configuration file")?;
    info!(
        "Injecting {} environment variables using {:?}",
        config.desired_env().len(),
        config.reposition_strategy
    );

    // The server stops by itself on CTRL+C.
    webhook_task(&args.tls_cert, &args.tls_key, args.port, args.config_file).await;

    info!("Exiting admission server");

    Ok(())
}
