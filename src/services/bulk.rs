use super::batch::{BatchExecutor, BatchOp, BatchUnit};
use super::report::CommandReport;
use super::selector::{Resolved, Selection, Selector};
use crate::domain::{Container, ContainerRuntime, ContainerState};
use crate::error::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Whether `container prune` should remove this container: stopped, or
/// exited and not part of a pod.
pub fn is_prunable(container: &Container) -> bool {
    match container.state {
        ContainerState::Stopped => true,
        ContainerState::Exited => !container.in_pod(),
        _ => false,
    }
}

/// Selector plus batch executor compositions for multi-container commands.
pub struct BulkService {
    runtime: Arc<dyn ContainerRuntime>,
    selector: Selector,
    max_workers: Option<usize>,
}

impl BulkService {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, max_workers: Option<usize>) -> Self {
        Self {
            selector: Selector::new(runtime.clone()),
            runtime,
            max_workers,
        }
    }

    /// Force-removes every prunable container.
    pub fn prune(&self) -> Result<CommandReport> {
        let mut selected = self.selector.select(&Selection::All(None))?;
        selected.targets.retain(|t| is_prunable(&t.container));

        if selected.targets.is_empty() {
            debug!("nothing to prune");
            return Ok(CommandReport::default());
        }

        info!("pruning {} container(s)", selected.targets.len());
        let mut report = CommandReport::from_selection(&mut selected);
        self.run_batch(BatchOp::Prune, selected.targets, &mut report, |id| {
            self.runtime.remove_container(id, true)
        });
        Ok(report)
    }

    pub fn stop(&self, selection: &Selection, timeout: Duration) -> Result<CommandReport> {
        let mut selected = self.selector.select(selection)?;
        let mut report = CommandReport::from_selection(&mut selected);
        self.run_batch(BatchOp::Stop, selected.targets, &mut report, |id| {
            self.runtime.stop_container(id, timeout)
        });
        Ok(report)
    }

    pub fn remove(&self, selection: &Selection, force: bool) -> Result<CommandReport> {
        let mut selected = self.selector.select(selection)?;
        let mut report = CommandReport::from_selection(&mut selected);
        self.run_batch(BatchOp::Remove, selected.targets, &mut report, |id| {
            self.runtime.remove_container(id, force)
        });
        Ok(report)
    }

    fn run_batch<F>(
        &self,
        op: BatchOp,
        targets: Vec<Resolved>,
        report: &mut CommandReport,
        action: F,
    ) where
        F: Fn(&str) -> Result<()> + Sync,
    {
        if targets.is_empty() {
            return;
        }

        let mut seen = HashSet::new();
        let action = &action;
        let units = targets
            .into_iter()
            .map(|t| t.container.id)
            .filter(|id| seen.insert(id.clone()))
            .map(|id| {
                BatchUnit::new(id.clone(), move || {
                    action(&id).inspect_err(|e| warn!("{op:?} failed for {id}: {e}"))
                })
            })
            .collect();

        let executor = BatchExecutor::for_op(op, self.max_workers);
        debug!("{op:?} with up to {} worker(s)", executor.max_workers());
        report.absorb_batch(executor.run(units));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::test_support::MockRuntime;

    fn service() -> (BulkService, Arc<MockRuntime>) {
        let mock = Arc::new(MockRuntime::new());
        (BulkService::new(mock.clone(), Some(4)), mock)
    }

    #[test]
    fn test_prunable_filter() {
        let exited = Container::new("a", ContainerState::Exited);
        assert!(is_prunable(&exited));
        assert!(!is_prunable(&exited.clone().with_pod("pod1")));
        assert!(is_prunable(
            &Container::new("b", ContainerState::Stopped).with_pod("pod1")
        ));

        for state in [
            ContainerState::Created,
            ContainerState::Running,
            ContainerState::Paused,
            ContainerState::Removing,
            ContainerState::Unknown,
        ] {
            assert!(!is_prunable(&Container::new("c", state)));
        }
    }

    #[test]
    fn test_prune_removes_only_qualifying_containers() {
        let (service, mock) = service();
        mock.add_container("stopped", ContainerState::Stopped);
        mock.add_container("exited", ContainerState::Exited);
        mock.add_container("running", ContainerState::Running);
        mock.insert(Container::new("in-pod", ContainerState::Exited).with_pod("p1"));

        let report = service.prune().unwrap();

        assert!(report.is_success());
        let mut echoed = report.echoed.clone();
        echoed.sort();
        assert_eq!(echoed, vec!["exited", "stopped"]);
        assert!(mock.container_exists("running"));
        assert!(mock.container_exists("in-pod"));
        assert_eq!(mock.count_commands("remove_forced:"), 2);
    }

    #[test]
    fn test_prune_with_nothing_to_do() {
        let (service, mock) = service();
        mock.add_container("running", ContainerState::Running);

        let report = service.prune().unwrap();

        assert!(report.is_success());
        assert!(report.echoed.is_empty());
        assert_eq!(mock.get_commands(), vec!["list"]);
    }

    #[test]
    fn test_prune_reports_every_failure() {
        let (service, mock) = service();
        for id in ["a", "b", "c", "d"] {
            mock.add_container(id, ContainerState::Exited);
        }
        mock.set_fail_on("remove:b");
        mock.set_fail_on("remove:d");

        let report = service.prune().unwrap();

        let failed: Vec<&str> = report.failures.iter().map(|(i, _)| i.as_str()).collect();
        assert_eq!(failed, vec!["b", "d"]);
        assert!(mock.container_exists("b"));
        assert!(!mock.container_exists("a"));
        assert!(matches!(
            report.into_error(),
            Some(EngineError::PartialBatchFailure { failed: 2, total: 4 })
        ));
    }

    #[test]
    fn test_stop_all_only_targets_running() {
        let (service, mock) = service();
        mock.add_container("r1", ContainerState::Running);
        mock.add_container("r2", ContainerState::Running);
        mock.add_container("e1", ContainerState::Exited);

        let report = service
            .stop(
                &Selection::All(Some(ContainerState::Running)),
                Duration::from_secs(1),
            )
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.echoed, vec!["r1", "r2"]);
        assert_eq!(mock.count_commands("stop:"), 2);
        assert_eq!(mock.get_state("r1"), Some(ContainerState::Stopped));
    }

    #[test]
    fn test_remove_with_missing_identifier() {
        let (service, mock) = service();
        mock.add_container("a", ContainerState::Exited);

        let report = service
            .remove(
                &Selection::Explicit(vec!["a".into(), "ghost".into()]),
                false,
            )
            .unwrap();

        assert_eq!(report.echoed, vec!["a"]);
        assert_eq!(mock.count_commands("remove:a"), 1);
        let err = report.into_error().unwrap();
        assert!(err.is_not_found());
    }
}
