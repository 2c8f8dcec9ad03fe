//! Shared test support: an in-memory container backend and tar helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use lokal::constants::{LABEL_DATABASE_COMPAT, LABEL_ENVIRONMENT, LABEL_ROLE};
use lokal::{
    ContainerApi, ContainerHandle, ContainerQuery, Error, ExecAttachment, ExecStatus, Result,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Builds a container handle with the standard environment labels.
pub fn container(id: &str, name: &str, environment: &str, role: &str) -> ContainerHandle {
    let mut labels = HashMap::new();
    labels.insert(LABEL_ENVIRONMENT.to_string(), environment.to_string());
    labels.insert(LABEL_ROLE.to_string(), role.to_string());
    ContainerHandle {
        id: id.to_string(),
        name: name.to_string(),
        labels,
    }
}

/// Builds a database container with a compat label.
pub fn database_container(
    id: &str,
    name: &str,
    environment: &str,
    compat: &str,
) -> ContainerHandle {
    let mut handle = container(id, name, environment, "database");
    handle
        .labels
        .insert(LABEL_DATABASE_COMPAT.to_string(), compat.to_string());
    handle
}

/// A tar archive holding one regular file.
pub fn tar_with_file(name: &str, content: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_path(name).unwrap();
    header.set_size(content.len() as u64);
    header.set_cksum();
    builder.append(&header, content).unwrap();
    builder.into_inner().unwrap()
}

/// A tar archive whose first entry is a directory.
pub fn tar_with_dir(name: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_path(name).unwrap();
    header.set_size(0);
    header.set_cksum();
    builder.append(&header, std::io::empty()).unwrap();
    builder.into_inner().unwrap()
}

#[derive(Default)]
struct FakeState {
    created: Vec<(String, Vec<String>)>,
    started: Vec<String>,
    inspects: usize,
    stopped: Vec<String>,
}

/// Scriptable in-memory [`ContainerApi`].
pub struct FakeContainerApi {
    containers: Vec<ContainerHandle>,
    polls_until_done: usize,
    exit_code: i64,
    always_running: bool,
    copy_archive: Option<Vec<u8>>,
    copy_error: Option<String>,
    fail_stop_for: Option<String>,
    state: Mutex<FakeState>,
}

impl FakeContainerApi {
    pub fn new(containers: Vec<ContainerHandle>) -> Self {
        Self {
            containers,
            polls_until_done: 0,
            exit_code: 0,
            always_running: false,
            copy_archive: None,
            copy_error: None,
            fail_stop_for: None,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Number of inspect calls that report "still running" before completion.
    pub fn with_polls_until_done(mut self, polls: usize) -> Self {
        self.polls_until_done = polls;
        self
    }

    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    /// The exec session never completes; used for timeout tests.
    pub fn always_running(mut self) -> Self {
        self.always_running = true;
        self
    }

    pub fn with_copy_archive(mut self, archive: Vec<u8>) -> Self {
        self.copy_archive = Some(archive);
        self
    }

    pub fn with_copy_error(mut self, message: &str) -> Self {
        self.copy_error = Some(message.to_string());
        self
    }

    pub fn with_stop_failure(mut self, container_id: &str) -> Self {
        self.fail_stop_for = Some(container_id.to_string());
        self
    }

    pub fn created_execs(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.state.lock().unwrap().stopped.clone()
    }

    pub fn inspect_count(&self) -> usize {
        self.state.lock().unwrap().inspects
    }
}

#[async_trait]
impl ContainerApi for FakeContainerApi {
    async fn list_containers(&self, query: &ContainerQuery) -> Result<Vec<ContainerHandle>> {
        Ok(self
            .containers
            .iter()
            .filter(|c| {
                c.labels.get(LABEL_ENVIRONMENT).map(String::as_str)
                    == Some(query.environment_name())
                    && query.role().map_or(true, |role| {
                        c.labels.get(LABEL_ROLE).map(String::as_str)
                            == Some(role.as_label_value())
                    })
            })
            .cloned()
            .collect())
    }

    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.created.push((container_id.to_string(), cmd));
        Ok(format!("exec-{}", state.created.len()))
    }

    async fn start_exec(&self, exec_id: &str) -> Result<ExecAttachment> {
        self.state
            .lock()
            .unwrap()
            .started
            .push(exec_id.to_string());
        let output = futures::stream::iter(Vec::<Result<Bytes>>::new()).boxed();
        Ok(ExecAttachment::new(output))
    }

    async fn inspect_exec(&self, _exec_id: &str) -> Result<ExecStatus> {
        let mut state = self.state.lock().unwrap();
        state.inspects += 1;
        if self.always_running || state.inspects <= self.polls_until_done {
            return Ok(ExecStatus {
                running: true,
                exit_code: None,
            });
        }
        Ok(ExecStatus {
            running: false,
            exit_code: Some(self.exit_code),
        })
    }

    async fn stop_container(&self, container_id: &str) -> Result<()> {
        if self.fail_stop_for.as_deref() == Some(container_id) {
            return Err(Error::Transport(format!(
                "cannot stop '{container_id}'"
            )));
        }
        self.state
            .lock()
            .unwrap()
            .stopped
            .push(container_id.to_string());
        Ok(())
    }

    async fn copy_from_container(&self, _container_id: &str, _path: &str) -> Result<Vec<u8>> {
        if let Some(message) = &self.copy_error {
            return Err(Error::Transport(message.clone()));
        }
        Ok(self.copy_archive.clone().unwrap_or_default())
    }
}
