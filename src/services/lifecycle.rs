use super::batch::{BatchExecutor, BatchOp, BatchUnit};
use super::report::CommandReport;
use super::selector::{Resolved, Selection, Selector};
use crate::domain::{
    AttachOptions, CREATE_CONFIG_ARTIFACT, ContainerRuntime, ContainerState, CreateConfig,
};
use crate::error::{EngineError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Start flags as given by the user. `sig_proxy` is `None` when not set.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub attach: bool,
    pub interactive: bool,
    pub detach_keys: Option<String>,
    pub sig_proxy: Option<bool>,
}

/// Start flags after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartPlan {
    pub attach: bool,
    pub interactive: bool,
    pub detach_keys: Option<String>,
    pub sig_proxy: bool,
}

impl StartOptions {
    /// Validates the flags against the selection without touching the runtime.
    pub fn plan(&self, selection: &Selection) -> Result<StartPlan> {
        if self.attach && selection.known_len().is_none_or(|n| n > 1) {
            return Err(EngineError::InvalidArgument(
                "you cannot start and attach multiple containers at once".into(),
            ));
        }

        let sig_proxy = match (self.sig_proxy, self.attach) {
            (Some(true), false) => {
                return Err(EngineError::InvalidArgument(
                    "you cannot use sig-proxy without --attach".into(),
                ));
            }
            (Some(explicit), _) => explicit,
            (None, attach) => attach,
        };

        Ok(StartPlan {
            attach: self.attach,
            interactive: self.interactive,
            detach_keys: self.detach_keys.clone(),
            sig_proxy,
        })
    }
}

/// Drives `start`, with or without an attached terminal.
pub struct Lifecycle {
    runtime: Arc<dyn ContainerRuntime>,
    selector: Selector,
    max_workers: Option<usize>,
}

impl Lifecycle {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, max_workers: Option<usize>) -> Self {
        Self {
            selector: Selector::new(runtime.clone()),
            runtime,
            max_workers,
        }
    }

    pub fn start(&self, selection: &Selection, options: &StartOptions) -> Result<CommandReport> {
        let plan = options.plan(selection)?;
        let mut selected = self.selector.select(selection)?;
        let mut report = CommandReport::from_selection(&mut selected);

        if plan.attach {
            if let Some(target) = selected.targets.first() {
                self.start_attached(target, &plan, &mut report);
            }
        } else {
            self.start_detached(selected.targets, &mut report);
        }

        Ok(report)
    }

    /// Starts every target that is not running yet, in parallel. Already
    /// running targets are echoed without a start call.
    fn start_detached(&self, targets: Vec<Resolved>, report: &mut CommandReport) {
        let mut seen = HashSet::new();
        let mut idents = HashMap::new();
        let mut units = Vec::with_capacity(targets.len());

        for target in targets {
            let id = target.container.id;
            if !seen.insert(id.clone()) {
                continue;
            }
            idents.insert(id.clone(), target.ident);
            units.push(BatchUnit::new(id.clone(), move || self.start_one(&id)));
        }

        let outcome = BatchExecutor::for_op(BatchOp::Start, self.max_workers).run(units);

        for id in outcome.succeeded {
            let ident = idents.remove(&id).unwrap_or(id);
            report.echoed.push(ident);
        }
        for failure in outcome.failures {
            let ident = idents
                .remove(&failure.container_id)
                .unwrap_or(failure.container_id);
            report.failures.push((ident, failure.error));
        }
    }

    fn start_one(&self, id: &str) -> Result<()> {
        if self.runtime.container_state(id)? == ContainerState::Running {
            debug!("{id} is already running");
            return Ok(());
        }

        if let Err(e) = self.runtime.start_container(id) {
            warn!("unable to start container {id}: {e}");
            self.remove_if_disposable(id);
            return Err(e);
        }

        info!("started {id}");
        Ok(())
    }

    fn start_attached(&self, target: &Resolved, plan: &StartPlan, report: &mut CommandReport) {
        let id = target.container.id.as_str();
        let state = match self.runtime.container_state(id) {
            Ok(state) => state,
            Err(e) => {
                report.failures.push((target.ident.clone(), e));
                return;
            }
        };
        let running = state == ContainerState::Running;

        let options = AttachOptions {
            stdin: plan.interactive,
            detach_keys: plan.detach_keys.clone(),
            sig_proxy: plan.sig_proxy,
            start: !running,
        };

        if running {
            debug!("{id} is already running, attaching only");
            if let Err(e) = self.runtime.attach_container(id, &options) {
                report.failures.push((target.ident.clone(), e));
            }
            return;
        }

        let _cleanup = CleanupGuard {
            runtime: self.runtime.as_ref(),
            id,
        };

        if let Err(e) = self.runtime.attach_container(id, &options) {
            warn!("unable to start container {id}: {e}");
            report.failures.push((target.ident.clone(), e));
            return;
        }

        match self.runtime.wait_container(id) {
            Ok(code) => {
                debug!("{id} exited with code {code}");
                report.exit_code = Some(code);
            }
            Err(e) => error!("unable to get exit code of container {id}: {e}"),
        }
    }

    /// Force-removes a container that failed to start if it was created
    /// with remove-on-exit. Failures here are only logged.
    fn remove_if_disposable(&self, id: &str) {
        let config = self
            .runtime
            .get_artifact(id, CREATE_CONFIG_ARTIFACT)
            .and_then(|bytes| CreateConfig::from_artifact(&bytes));

        match config {
            Ok(config) if config.rm => match self.runtime.remove_container(id, true) {
                Ok(()) => info!("removed container {id} after it failed to start"),
                Err(e) => error!("unable to remove container {id} after it failed to start: {e}"),
            },
            Ok(_) => {}
            Err(e) => warn!("unable to detect if container {id} should be removed: {e}"),
        }
    }
}

/// Releases the container's resources once an attached run is over,
/// whichever way it ended.
struct CleanupGuard<'a> {
    runtime: &'a dyn ContainerRuntime,
    id: &'a str,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.runtime.cleanup_container(self.id) {
            warn!("unable to clean up container {}: {e}", self.id);
        }
    }
}
