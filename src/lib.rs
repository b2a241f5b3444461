pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{AttachOptions, Container, ContainerRuntime, ContainerState};
pub use error::{EngineError, Result};
pub use infra::PodmanAdapter;
pub use services::{
    BatchExecutor, BulkService, CommandReport, Lifecycle, Selection, SelectionFlags, Selector,
    StartOptions,
};
