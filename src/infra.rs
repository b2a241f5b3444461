pub mod config;
pub mod podman_adapter;

pub use config::{AppConfig, EngineConfig};
pub use podman_adapter::PodmanAdapter;
