use super::containers::{RmArgs, StopArgs};
use super::detach_keys::parse_detach_keys;
use super::start::StartArgs;
use crate::domain::{ContainerRuntime, ContainerState};
use crate::infra::PodmanAdapter;
use crate::infra::config::{AppConfig, load_app_config};
use crate::services::{BulkService, CommandReport, Lifecycle};
use anyhow::{Result, anyhow};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything one command invocation needs: merged config and a runtime.
pub struct Session {
    config: AppConfig,
    runtime: Arc<dyn ContainerRuntime>,
    max_workers: Option<usize>,
}

impl Session {
    /// `max_workers` from the command line takes precedence over the config.
    pub fn new(config_dir: &Path, max_workers: Option<usize>) -> Result<Self> {
        let config = load_app_config(config_dir)?;
        let runtime = Arc::new(PodmanAdapter::with_binary(config.runtime_binary()));
        Ok(Self::with_runtime(config, runtime, max_workers))
    }

    pub fn with_runtime(
        config: AppConfig,
        runtime: Arc<dyn ContainerRuntime>,
        max_workers: Option<usize>,
    ) -> Self {
        Self {
            config,
            runtime,
            max_workers,
        }
    }

    fn max_workers(&self) -> Option<usize> {
        let workers = self
            .max_workers
            .filter(|n| *n > 0)
            .or_else(|| self.config.max_workers());
        debug!("maximum workers: {:?}", workers);
        workers
    }

    fn default_detach_keys(&self) -> Result<Option<String>> {
        self.config
            .engine
            .detach_keys
            .as_deref()
            .map(parse_detach_keys)
            .transpose()
            .map_err(|e| anyhow!("detach_keys in config: {e}"))
    }

    pub fn start(&self, args: StartArgs) -> Result<CommandReport> {
        let (flags, options) = args.into_parts(self.default_detach_keys()?);
        let selection = flags.into_selection(None)?;
        let lifecycle = Lifecycle::new(self.runtime.clone(), self.max_workers());
        Ok(lifecycle.start(&selection, &options)?)
    }

    pub fn stop(&self, args: StopArgs) -> Result<CommandReport> {
        let selection = args
            .selection_flags()
            .into_selection(Some(ContainerState::Running))?;
        let timeout = args
            .time
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.config.stop_timeout());
        Ok(self.bulk().stop(&selection, timeout)?)
    }

    pub fn remove(&self, args: RmArgs) -> Result<CommandReport> {
        let selection = args.selection_flags().into_selection(None)?;
        Ok(self.bulk().remove(&selection, args.force)?)
    }

    pub fn prune(&self) -> Result<CommandReport> {
        Ok(self.bulk().prune()?)
    }

    fn bulk(&self) -> BulkService {
        BulkService::new(self.runtime.clone(), self.max_workers())
    }
}

/// Echoes the report's identifiers and turns it into the status the process
/// should exit with: the attached process's exit code, or 0.
pub fn finish(report: CommandReport) -> Result<i32> {
    finish_to(report, &mut io::stdout().lock(), &mut io::stderr().lock())
}

/// [`finish`] with explicit output streams. Identifiers go to `out`, every
/// failure not carried by the returned error goes to `err`.
pub fn finish_to(
    report: CommandReport,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32> {
    for ident in &report.echoed {
        writeln!(out, "{ident}")?;
    }

    let exit_code = report.exit_code.unwrap_or(0);
    let (printed, error) = report.into_failures();
    for (_, e) in &printed {
        writeln!(err, "Error: {e}")?;
    }

    match error {
        Some(e) => Err(e.into()),
        None => Ok(exit_code),
    }
}
