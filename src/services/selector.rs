use crate::domain::{Container, ContainerRuntime, ContainerState};
use crate::error::{EngineError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Which containers a bulk command should act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Explicit(Vec<String>),
    /// Every container, optionally only those in the given state.
    All(Option<ContainerState>),
    Latest,
}

impl Selection {
    /// Upper bound on the number of targets, if known without runtime I/O.
    pub fn known_len(&self) -> Option<usize> {
        match self {
            Self::Explicit(ids) => Some(ids.len()),
            Self::Latest => Some(1),
            Self::All(_) => None,
        }
    }
}

/// Raw selection flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SelectionFlags {
    pub ids: Vec<String>,
    pub all: bool,
    pub latest: bool,
}

impl SelectionFlags {
    /// Checks the `--all` / `--latest` / identifiers combination.
    ///
    /// `all_state` is the state `--all` is restricted to for this command.
    pub fn into_selection(self, all_state: Option<ContainerState>) -> Result<Selection> {
        if (self.all || self.latest) && !self.ids.is_empty() {
            return Err(EngineError::InvalidArgument(
                "no arguments are needed with --all or --latest".into(),
            ));
        }
        if self.all && self.latest {
            return Err(EngineError::InvalidArgument(
                "--all and --latest cannot be used together".into(),
            ));
        }
        if self.all {
            return Ok(Selection::All(all_state));
        }
        if self.latest {
            return Ok(Selection::Latest);
        }
        if self.ids.is_empty() {
            return Err(EngineError::InvalidArgument(
                "you must provide at least one container name or id".into(),
            ));
        }
        Ok(Selection::Explicit(self.ids))
    }
}

/// A container together with the identifier that selected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub ident: String,
    pub container: Container,
}

impl From<Container> for Resolved {
    fn from(container: Container) -> Self {
        Self {
            ident: container.id.clone(),
            container,
        }
    }
}

/// Outcome of a selection: resolved containers plus per-identifier failures,
/// both in input order.
#[derive(Debug, Default)]
pub struct Selected {
    pub targets: Vec<Resolved>,
    pub failures: Vec<(String, EngineError)>,
}

impl Selected {
    pub fn ids(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.container.id.as_str()).collect()
    }
}

pub struct Selector {
    runtime: Arc<dyn ContainerRuntime>,
}

impl Selector {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Resolves a selection. Only bulk queries (`All`, `Latest`) fail as a
    /// whole; explicit identifiers that do not resolve end up in
    /// [`Selected::failures`].
    pub fn select(&self, selection: &Selection) -> Result<Selected> {
        match selection {
            Selection::Explicit(ids) => Ok(self.lookup_each(ids)),
            Selection::All(state) => {
                let mut containers = self.runtime.list_containers()?;
                if let Some(state) = state {
                    containers.retain(|c| c.state == *state);
                }
                debug!("{} container(s) selected", containers.len());
                Ok(Selected {
                    targets: containers.into_iter().map(Resolved::from).collect(),
                    failures: Vec::new(),
                })
            }
            Selection::Latest => {
                let latest = self.runtime.latest_container()?;
                debug!("latest container is {}", latest.id);
                Ok(Selected {
                    targets: vec![latest.into()],
                    failures: Vec::new(),
                })
            }
        }
    }

    fn lookup_each(&self, ids: &[String]) -> Selected {
        let mut selected = Selected::default();

        for ident in ids {
            match self.runtime.lookup_container(ident) {
                Ok(container) => selected.targets.push(Resolved {
                    ident: ident.clone(),
                    container,
                }),
                Err(e) => {
                    warn!("unable to find container {ident}: {e}");
                    selected.failures.push((ident.clone(), e));
                }
            }
        }

        selected
    }
}
