use crate::domain::{AttachOptions, Container, ContainerRuntime, ContainerState, latest_of};
use crate::error::{EngineError, Result};
use crate::infra::config::DEFAULT_RUNTIME_BINARY;
use serde::Deserialize;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::Duration;
use tracing::debug;

/// Exit status podman reserves for failures of podman itself; any other
/// status from an attached run belongs to the container's process.
const RUNTIME_FAILURE_STATUS: i32 = 125;

#[derive(Debug, Clone)]
pub struct PodmanAdapter {
    binary: String,
}

impl PodmanAdapter {
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_RUNTIME_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd
    }

    /// Runs podman with captured output, mapping failures onto `action`.
    fn output<I, S>(&self, args: I, action: &'static str, id: &str) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(args);
        debug!("running {:?}", cmd);
        let output = cmd.output()?;

        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.to_ascii_lowercase().contains("no such container") {
            return Err(EngineError::NotFound(id.to_string()));
        }
        Err(EngineError::runtime(action, id, status_reason(&output, &stderr)))
    }

    fn inspect(&self, ident: &str) -> Result<InspectEntry> {
        let output = self.output(
            ["container", "inspect", "--format", "json", ident],
            "inspect",
            ident,
        )?;
        let entries: Vec<InspectEntry> = serde_json::from_slice(&output.stdout)?;
        entries
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NotFound(ident.to_string()))
    }
}

impl Default for PodmanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsEntry {
    id: String,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    pod: String,
}

impl From<PsEntry> for Container {
    fn from(entry: PsEntry) -> Self {
        let mut container = Container::new(entry.id, ContainerState::parse(&entry.state))
            .with_created(entry.created);
        if let Some(name) = entry.names.into_iter().next() {
            container = container.with_name(name);
        }
        if !entry.pod.is_empty() {
            container = container.with_pod(entry.pod);
        }
        container
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectEntry {
    id: String,
    #[serde(default)]
    name: String,
    state: InspectState,
    #[serde(default)]
    pod: String,
    #[serde(default)]
    static_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    status: String,
}

impl From<InspectEntry> for Container {
    fn from(entry: InspectEntry) -> Self {
        // inspect reports the creation time as RFC 3339; only listings are
        // ordered by it, so it is left unset here.
        let mut container = Container::new(entry.id, ContainerState::parse(&entry.state.status));
        if !entry.name.is_empty() {
            container = container.with_name(entry.name);
        }
        if !entry.pod.is_empty() {
            container = container.with_pod(entry.pod);
        }
        container
    }
}

impl ContainerRuntime for PodmanAdapter {
    fn lookup_container(&self, ident: &str) -> Result<Container> {
        Ok(self.inspect(ident)?.into())
    }

    fn list_containers(&self) -> Result<Vec<Container>> {
        let output = self.output(["ps", "--all", "--format", "json"], "list", "all")?;
        let entries: Vec<PsEntry> = serde_json::from_slice(&output.stdout)?;
        Ok(entries.into_iter().map(Container::from).collect())
    }

    fn latest_container(&self) -> Result<Container> {
        let containers = self.list_containers()?;
        latest_of(&containers)
            .cloned()
            .ok_or_else(|| EngineError::NotFound("latest".to_string()))
    }

    fn container_state(&self, id: &str) -> Result<ContainerState> {
        let output = self.output(
            ["container", "inspect", "--format", "{{.State.Status}}", id],
            "inspect",
            id,
        )?;
        Ok(ContainerState::parse(&String::from_utf8_lossy(&output.stdout)))
    }

    fn start_container(&self, id: &str) -> Result<()> {
        self.output(["start", id], "start", id).map(|_| ())
    }

    fn wait_container(&self, id: &str) -> Result<i32> {
        let output = self.output(["wait", id], "wait for", id)?;
        let raw = String::from_utf8_lossy(&output.stdout);
        raw.trim()
            .parse()
            .map_err(|e| EngineError::runtime("wait for", id, format!("bad exit code {raw:?}: {e}")))
    }

    fn stop_container(&self, id: &str, timeout: Duration) -> Result<()> {
        let secs = timeout.as_secs().to_string();
        self.output(["stop", "--time", secs.as_str(), id], "stop", id)
            .map(|_| ())
    }

    fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let mut args = vec!["rm"];
        if force {
            args.push("--force");
        }
        args.push(id);
        self.output(args, "remove", id).map(|_| ())
    }

    fn get_artifact(&self, id: &str, key: &str) -> Result<Vec<u8>> {
        let entry = self.inspect(id)?;
        let path = entry.static_dir.join("artifacts").join(key);
        debug!("reading artifact {:?}", path);
        Ok(fs::read(path)?)
    }

    fn attach_container(&self, id: &str, options: &AttachOptions) -> Result<()> {
        let mut args: Vec<String> = if options.start {
            vec!["start".into(), "--attach".into()]
        } else {
            vec!["attach".into()]
        };

        match (options.start, options.stdin) {
            (true, true) => args.push("--interactive".into()),
            (false, false) => args.push("--no-stdin".into()),
            _ => {}
        }
        if let Some(keys) = &options.detach_keys {
            args.push(format!("--detach-keys={keys}"));
        }
        args.push(format!("--sig-proxy={}", options.sig_proxy));
        args.push(id.into());

        let mut cmd = self.command(&args);
        debug!("running {:?}", cmd);
        let status = cmd.status()?;

        match status.code() {
            Some(RUNTIME_FAILURE_STATUS) => Err(EngineError::runtime(
                "attach to",
                id,
                format!("{} exited with status {RUNTIME_FAILURE_STATUS}", self.binary),
            )),
            None => Err(EngineError::runtime(
                "attach to",
                id,
                "attach session killed by signal",
            )),
            Some(_) => Ok(()),
        }
    }

    fn cleanup_container(&self, id: &str) -> Result<()> {
        self.output(["container", "cleanup", id], "clean up", id)
            .map(|_| ())
    }
}

fn status_reason(output: &Output, stderr: &str) -> String {
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ps_output() {
        let json = r#"[
            {"Id": "abc123", "Names": ["web"], "State": "running", "Created": 1700000000, "Pod": ""},
            {"Id": "def456", "Names": [], "State": "exited", "Created": 1700000100, "Pod": "p1"}
        ]"#;
        let entries: Vec<PsEntry> = serde_json::from_str(json).unwrap();
        let containers: Vec<Container> = entries.into_iter().map(Container::from).collect();

        assert_eq!(containers[0].name.as_deref(), Some("web"));
        assert!(containers[0].is_running());
        assert!(!containers[0].in_pod());
        assert_eq!(containers[1].state, ContainerState::Exited);
        assert_eq!(containers[1].pod_id.as_deref(), Some("p1"));
        assert_eq!(latest_of(&containers).unwrap().id, "def456");
    }

    #[test]
    fn parses_inspect_output() {
        let json = r#"[{
            "Id": "abc123",
            "Name": "web",
            "State": {"Status": "configured", "Running": false},
            "Pod": "",
            "StaticDir": "/var/lib/containers/storage/overlay-containers/abc123/userdata"
        }]"#;
        let mut entries: Vec<InspectEntry> = serde_json::from_str(json).unwrap();
        let entry = entries.remove(0);
        assert_eq!(
            entry.static_dir.join("artifacts").join("create-config"),
            PathBuf::from(
                "/var/lib/containers/storage/overlay-containers/abc123/userdata/artifacts/create-config"
            )
        );

        let container = Container::from(entry);
        assert_eq!(container.state, ContainerState::Created);
        assert_eq!(container.name.as_deref(), Some("web"));
    }

    #[test]
    fn missing_binary_is_an_io_error() {
        let adapter = PodmanAdapter::with_binary("/nonexistent/boxctl-test-podman");
        assert!(matches!(
            adapter.start_container("x"),
            Err(EngineError::Io(_))
        ));
    }
}
