use serde::Deserialize;
use std::fmt;

/// Artifact key under which the runtime keeps the original creation config.
pub const CREATE_CONFIG_ARTIFACT: &str = "create-config";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerState {
    Created,
    Running,
    Stopped,
    Paused,
    Exited,
    Removing,
    Unknown,
}

impl ContainerState {
    pub const ALL: [ContainerState; 7] = [
        Self::Created,
        Self::Running,
        Self::Stopped,
        Self::Paused,
        Self::Exited,
        Self::Removing,
        Self::Unknown,
    ];

    /// Parses the state string reported by the runtime.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" | "configured" => Self::Created,
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            "paused" => Self::Paused,
            "exited" => Self::Exited,
            "removing" => Self::Removing,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Exited => "exited",
            Self::Removing => "removing",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Snapshot of a runtime-managed container taken at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub name: Option<String>,
    pub state: ContainerState,
    /// Creation time in seconds since the epoch.
    pub created: i64,
    pub pod_id: Option<String>,
}

impl Container {
    pub fn new(id: impl Into<String>, state: ContainerState) -> Self {
        Self {
            id: id.into(),
            name: None,
            state,
            created: 0,
            pod_id: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn with_pod(mut self, pod_id: impl Into<String>) -> Self {
        self.pod_id = Some(pod_id.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }

    pub fn in_pod(&self) -> bool {
        self.pod_id.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Whether `ident` names this container by full ID, ID prefix, or name.
    pub fn matches(&self, ident: &str) -> bool {
        !ident.is_empty()
            && (self.id.starts_with(ident) || self.name.as_deref() == Some(ident))
    }
}

/// Picks the most recently created container; ties go to the greater ID.
pub fn latest_of<'a, I>(containers: I) -> Option<&'a Container>
where
    I: IntoIterator<Item = &'a Container>,
{
    containers
        .into_iter()
        .max_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)))
}

/// The subset of the creation config the engine cares about.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CreateConfig {
    /// Remove the container once its process exits or fails to start.
    #[serde(default, alias = "Rm")]
    pub rm: bool,
}

impl CreateConfig {
    pub fn from_artifact(bytes: &[u8]) -> crate::error::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
