use crate::domain::{
    AttachOptions, CREATE_CONFIG_ARTIFACT, Container, ContainerRuntime, ContainerState, latest_of,
};
use crate::error::{EngineError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MockContainer {
    pub container: Container,
    pub artifacts: HashMap<String, Vec<u8>>,
    pub exit_code: i32,
}

/// In-memory runtime that records every call as `"op:id"`.
#[derive(Debug)]
pub struct MockRuntime {
    containers: RwLock<Vec<MockContainer>>,
    commands: RwLock<Vec<String>>,
    attaches: RwLock<Vec<AttachOptions>>,
    fail_on: RwLock<HashSet<String>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(Vec::new()),
            commands: RwLock::new(Vec::new()),
            attaches: RwLock::new(Vec::new()),
            fail_on: RwLock::new(HashSet::new()),
        }
    }

    /// Adds a container; creation times increase in insertion order.
    pub fn add_container(&self, id: &str, state: ContainerState) {
        let created = self.containers.read().unwrap().len() as i64 + 1;
        self.insert(Container::new(id, state).with_created(created));
    }

    pub fn insert(&self, container: Container) {
        self.containers.write().unwrap().push(MockContainer {
            container,
            artifacts: HashMap::new(),
            exit_code: 0,
        });
    }

    pub fn set_artifact(&self, id: &str, key: &str, bytes: &[u8]) {
        self.find_mut(id, |c| c.artifacts.insert(key.to_string(), bytes.to_vec()));
    }

    /// Marks a container as created with `--rm`.
    pub fn set_remove_on_exit(&self, id: &str) {
        self.set_artifact(id, CREATE_CONFIG_ARTIFACT, br#"{"Rm":true}"#);
    }

    pub fn set_exit_code(&self, id: &str, code: i32) {
        self.find_mut(id, |c| c.exit_code = code);
    }

    /// Fails every call of `operation`, or only those against one container
    /// when given as `"operation:id"`.
    pub fn set_fail_on(&self, operation: &str) {
        self.fail_on.write().unwrap().insert(operation.to_string());
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn count_commands(&self, prefix: &str) -> usize {
        self.commands
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn get_attaches(&self) -> Vec<AttachOptions> {
        self.attaches.read().unwrap().clone()
    }

    pub fn container_exists(&self, id: &str) -> bool {
        self.get_state(id).is_some()
    }

    pub fn get_state(&self, id: &str) -> Option<ContainerState> {
        self.containers
            .read()
            .unwrap()
            .iter()
            .find(|c| c.container.id == id)
            .map(|c| c.container.state)
    }

    fn find_mut<T>(&self, id: &str, f: impl FnOnce(&mut MockContainer) -> T) -> Option<T> {
        let mut containers = self.containers.write().unwrap();
        containers.iter_mut().find(|c| c.container.id == id).map(f)
    }

    fn set_state(&self, id: &str, state: ContainerState) -> Result<()> {
        self.find_mut(id, |c| c.container.state = state)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &'static str, id: &str) -> Result<()> {
        let fail_on = self.fail_on.read().unwrap();
        if fail_on.contains(operation) || fail_on.contains(&format!("{operation}:{id}")) {
            return Err(EngineError::runtime(operation, id, "mock failure"));
        }
        Ok(())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for MockRuntime {
    fn lookup_container(&self, ident: &str) -> Result<Container> {
        self.record_command(&format!("lookup:{ident}"));
        self.check_fail("lookup", ident)?;

        self.containers
            .read()
            .unwrap()
            .iter()
            .map(|c| &c.container)
            .find(|c| c.matches(ident))
            .cloned()
            .ok_or_else(|| EngineError::NotFound(ident.to_string()))
    }

    fn list_containers(&self) -> Result<Vec<Container>> {
        self.record_command("list");
        self.check_fail("list", "")?;

        Ok(self
            .containers
            .read()
            .unwrap()
            .iter()
            .map(|c| c.container.clone())
            .collect())
    }

    fn latest_container(&self) -> Result<Container> {
        self.record_command("latest");
        self.check_fail("latest", "")?;

        let containers = self.containers.read().unwrap();
        latest_of(containers.iter().map(|c| &c.container))
            .cloned()
            .ok_or_else(|| EngineError::NotFound("latest".to_string()))
    }

    fn container_state(&self, id: &str) -> Result<ContainerState> {
        self.record_command(&format!("state:{id}"));
        self.check_fail("state", id)?;

        self.get_state(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    fn start_container(&self, id: &str) -> Result<()> {
        self.record_command(&format!("start:{id}"));
        self.check_fail("start", id)?;
        self.set_state(id, ContainerState::Running)
    }

    fn wait_container(&self, id: &str) -> Result<i32> {
        self.record_command(&format!("wait:{id}"));
        self.check_fail("wait", id)?;

        self.find_mut(id, |c| {
            c.container.state = ContainerState::Exited;
            c.exit_code
        })
        .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    fn stop_container(&self, id: &str, _timeout: Duration) -> Result<()> {
        self.record_command(&format!("stop:{id}"));
        self.check_fail("stop", id)?;
        self.set_state(id, ContainerState::Stopped)
    }

    fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let op = if force { "remove_forced" } else { "remove" };
        self.record_command(&format!("{op}:{id}"));
        self.check_fail("remove", id)?;

        let mut containers = self.containers.write().unwrap();
        let before = containers.len();
        containers.retain(|c| c.container.id != id);
        if containers.len() == before {
            return Err(EngineError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_artifact(&self, id: &str, key: &str) -> Result<Vec<u8>> {
        self.record_command(&format!("artifact:{id}"));
        self.check_fail("artifact", id)?;

        self.find_mut(id, |c| c.artifacts.get(key).cloned())
            .flatten()
            .ok_or_else(|| EngineError::runtime("read artifact of", id, format!("no {key}")))
    }

    fn attach_container(&self, id: &str, options: &AttachOptions) -> Result<()> {
        self.record_command(&format!("attach:{id}"));
        self.attaches.write().unwrap().push(options.clone());
        self.check_fail("attach", id)?;

        if options.start {
            self.set_state(id, ContainerState::Running)?;
        }
        Ok(())
    }

    fn cleanup_container(&self, id: &str) -> Result<()> {
        self.record_command(&format!("cleanup:{id}"));
        self.check_fail("cleanup", id)
    }
}
