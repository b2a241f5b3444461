mod container;
pub mod traits;

pub use container::{CREATE_CONFIG_ARTIFACT, Container, ContainerState, CreateConfig, latest_of};
pub use traits::{AttachOptions, ContainerRuntime};
