use super::{Container, ContainerState};
use crate::error::Result;
use std::fmt::Debug;
use std::time::Duration;

/// How an attach session should be wired up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachOptions {
    /// Forward our stdin to the container.
    pub stdin: bool,
    /// Key sequence that ends the session without stopping the process.
    pub detach_keys: Option<String>,
    /// Forward signals received by this process to the container.
    pub sig_proxy: bool,
    /// Start the container once the attach stream is set up.
    pub start: bool,
}

/// Trait for container runtime operations
pub trait ContainerRuntime: Send + Sync + Debug {
    /// Resolve a name, full ID or unique ID prefix
    fn lookup_container(&self, ident: &str) -> Result<Container>;

    /// List every container the runtime knows about
    fn list_containers(&self) -> Result<Vec<Container>>;

    /// The most recently created container
    fn latest_container(&self) -> Result<Container>;

    /// Current state of a container
    fn container_state(&self, id: &str) -> Result<ContainerState>;

    /// Start a container without attaching to it
    fn start_container(&self, id: &str) -> Result<()>;

    /// Block until the container's process exits and return its exit code
    fn wait_container(&self, id: &str) -> Result<i32>;

    /// Stop a running container, killing it after `timeout`
    fn stop_container(&self, id: &str, timeout: Duration) -> Result<()>;

    /// Remove a container; `force` stops it first if needed
    fn remove_container(&self, id: &str, force: bool) -> Result<()>;

    /// Read an artifact stored alongside the container at creation time
    fn get_artifact(&self, id: &str, key: &str) -> Result<Vec<u8>>;

    /// Attach the terminal to a container, optionally starting it
    fn attach_container(&self, id: &str, options: &AttachOptions) -> Result<()>;

    /// Release mounts and network resources held after the process exited
    fn cleanup_container(&self, id: &str) -> Result<()>;
}
