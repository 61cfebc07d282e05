/// Names and paths of the Kubernetes objects touched by the injector.
pub mod consts {
    pub const FIELD_INIT_CONTAINERS: &str = "initContainers";
    pub const FIELD_CONTAINERS: &str = "containers";
    pub const FIELD_ENV: &str = "env";

    pub const ENV_AGENT_HOST: &str = "DD_AGENT_HOST";
    pub const ENV_DEV_VERSION: &str = "DEV_VERSION";
    pub const DEV_VERSION: &str = "dev-1";

    pub const FIELD_PATH_HOST_IP: &str = "status.hostIP";
}
