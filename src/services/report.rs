use super::batch::BatchOutcome;
use super::selector::Selected;
use crate::error::EngineError;

/// What a command produced: identifiers to echo, per-target failures in the
/// order they happened, and the attached process's exit code if any.
#[derive(Debug, Default)]
pub struct CommandReport {
    pub echoed: Vec<String>,
    pub failures: Vec<(String, EngineError)>,
    pub exit_code: Option<i32>,
    pub(crate) batch: Option<(usize, usize)>,
}

impl CommandReport {
    pub(crate) fn from_selection(selected: &mut Selected) -> Self {
        Self {
            failures: std::mem::take(&mut selected.failures),
            ..Default::default()
        }
    }

    /// Folds a batch outcome in. Once a batch with failures is recorded the
    /// report's error is the batch summary rather than the last failure.
    /// Identifiers that already failed selection count towards the summary.
    pub(crate) fn absorb_batch(&mut self, outcome: BatchOutcome) {
        if !outcome.is_success() {
            let unresolved = self.failures.len();
            self.batch = Some((outcome.failed() + unresolved, outcome.total + unresolved));
        }
        self.echoed.extend(outcome.succeeded);
        self.failures.extend(
            outcome
                .failures
                .into_iter()
                .map(|f| (f.container_id, f.error)),
        );
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn last_error(&self) -> Option<&EngineError> {
        self.failures.last().map(|(_, e)| e)
    }

    /// The single error representing this command, if it failed.
    pub fn into_error(self) -> Option<EngineError> {
        self.into_failures().1
    }

    /// Splits the failures into those to print on their own and the error
    /// representing the command. A batch summary names no container, so
    /// every failure is printed; otherwise the last failure is the error.
    pub fn into_failures(mut self) -> (Vec<(String, EngineError)>, Option<EngineError>) {
        if let Some((failed, total)) = self.batch {
            return (
                self.failures,
                Some(EngineError::PartialBatchFailure { failed, total }),
            );
        }
        let last = self.failures.pop().map(|(_, e)| e);
        (self.failures, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::batch::TaggedError;

    #[test]
    fn test_last_failure_represents_command() {
        let report = CommandReport {
            failures: vec![
                ("a".into(), EngineError::NotFound("a".into())),
                ("b".into(), EngineError::NotFound("b".into())),
            ],
            ..Default::default()
        };
        assert!(!report.is_success());
        let err = report.into_error().unwrap();
        assert_eq!(err.to_string(), "no such container: b");
    }

    #[test]
    fn test_batch_failure_summarises() {
        let mut report = CommandReport::default();
        report.absorb_batch(BatchOutcome {
            total: 3,
            succeeded: vec!["a".into(), "c".into()],
            failures: vec![TaggedError {
                container_id: "b".into(),
                error: EngineError::runtime("remove", "b", "busy"),
            }],
        });

        assert_eq!(report.echoed, vec!["a", "c"]);
        assert!(matches!(
            report.into_error(),
            Some(EngineError::PartialBatchFailure {
                failed: 1,
                total: 3
            })
        ));
    }

    #[test]
    fn test_batch_summary_counts_unresolved_identifiers() {
        let mut report = CommandReport {
            failures: vec![("ghost".into(), EngineError::NotFound("ghost".into()))],
            ..Default::default()
        };
        report.absorb_batch(BatchOutcome {
            total: 1,
            succeeded: vec![],
            failures: vec![TaggedError {
                container_id: "a".into(),
                error: EngineError::runtime("remove", "a", "busy"),
            }],
        });

        let failed: Vec<&str> = report.failures.iter().map(|(i, _)| i.as_str()).collect();
        assert_eq!(failed, vec!["ghost", "a"]);
        assert_eq!(
            report.into_error().unwrap().to_string(),
            "2 of 2 containers failed"
        );
    }

    #[test]
    fn test_clean_report_has_no_error() {
        let mut report = CommandReport::default();
        report.absorb_batch(BatchOutcome::default());
        assert!(report.is_success());
        assert!(report.into_error().is_none());
    }
}
