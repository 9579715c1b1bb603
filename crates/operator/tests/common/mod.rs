#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use selfheal_operator::{
    artifacts::InMemoryStore,
    capture::DiagnosticCapturer,
    config::CaptureConfig,
    kubernetes::{Orchestrator, PodExec, PodState},
    notify::{Notifier, NotifyChannel},
    remediation::{RemediationCoordinator, RemediationOutcome, WorkerPool},
    server::Server,
    Error, Result,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const FOLDER_LINK: &str = "https://drive.google.com/drive/u/0/folders/folder-1";

/// In-memory cluster: pods are looked up by (namespace, name).
#[derive(Default)]
pub struct FakeCluster {
    pods: Mutex<HashMap<(String, String), PodState>>,
    failing_lookups: Mutex<Vec<String>>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl FakeCluster {
    pub fn with_ready_pod(self, namespace: &str, name: &str) -> Self {
        self.pods.lock().unwrap().insert(
            (namespace.to_string(), name.to_string()),
            PodState::running(vec![true, true]),
        );
        self
    }

    pub fn with_pod(self, namespace: &str, name: &str, state: PodState) -> Self {
        self.pods
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), state);
        self
    }

    pub fn fail_lookup(self, name: &str) -> Self {
        self.failing_lookups.lock().unwrap().push(name.to_string());
        self
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Orchestrator for FakeCluster {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<PodState>> {
        if self.failing_lookups.lock().unwrap().iter().any(|n| n == name) {
            return Err(Error::Lookup(format!("pods \"{}\" is forbidden", name)));
        }
        Ok(self
            .pods
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let key = (namespace.to_string(), name.to_string());
        self.pods.lock().unwrap().remove(&key);
        self.deleted.lock().unwrap().push(key);
        Ok(())
    }
}

/// Pretends to be a JVM: every command succeeds and produces a small dump.
#[derive(Default)]
pub struct FakeJvm {
    commands: Mutex<Vec<Vec<String>>>,
}

impl FakeJvm {
    pub fn programs(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|c| c[0].clone())
            .collect()
    }
}

#[async_trait]
impl PodExec for FakeJvm {
    async fn exec_to_file(&self, _ns: &str, _name: &str, command: Vec<String>, dest: &Path) -> Result<()> {
        self.commands.lock().unwrap().push(command);
        std::fs::write(dest, "Full thread dump OpenJDK 64-Bit Server VM")?;
        Ok(())
    }

    async fn exec(&self, _ns: &str, _name: &str, command: Vec<String>) -> Result<()> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }

    async fn copy_from_pod(&self, _ns: &str, _name: &str, remote: &str, dest: &Path) -> Result<()> {
        self.commands
            .lock()
            .unwrap()
            .push(vec!["cat".to_string(), remote.to_string()]);
        std::fs::write(dest, b"JAVA PROFILE 1.0.2")?;
        Ok(())
    }
}

pub struct RecordingChannel(mpsc::UnboundedSender<RemediationOutcome>);

#[async_trait]
impl NotifyChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, outcome: &RemediationOutcome) -> Result<()> {
        let _ = self.0.send(outcome.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub cluster: Arc<FakeCluster>,
    pub jvm: Arc<FakeJvm>,
    pub store: Arc<InMemoryStore>,
    pub notifications: mpsc::UnboundedReceiver<RemediationOutcome>,
    _dumps: tempfile::TempDir,
}

impl TestApp {
    pub fn new(cluster: FakeCluster) -> Self {
        let dumps = tempfile::tempdir().unwrap();
        let cluster = Arc::new(cluster);
        let jvm = Arc::new(FakeJvm::default());
        let store = Arc::new(InMemoryStore::new());

        let config = CaptureConfig {
            output_dir: dumps.path().to_path_buf(),
            ..Default::default()
        };
        let capturer =
            DiagnosticCapturer::new(jvm.clone(), store.clone(), "folder-1", &config).unwrap();

        let (tx, notifications) = mpsc::unbounded_channel();
        let notifier = Notifier::with_channels(vec![Arc::new(RecordingChannel(tx))]);

        let coordinator = RemediationCoordinator::new(
            cluster.clone(),
            Arc::new(capturer),
            Arc::new(notifier),
            WorkerPool::start(2, 8),
            FOLDER_LINK,
        );
        let server = TestServer::new(Server::new(coordinator).build_router()).unwrap();

        Self {
            server,
            cluster,
            jvm,
            store,
            notifications,
            _dumps: dumps,
        }
    }

    pub async fn next_notification(&mut self) -> RemediationOutcome {
        tokio::time::timeout(Duration::from_secs(5), self.notifications.recv())
            .await
            .expect("no notification within 5s")
            .expect("notification channel closed")
    }

    pub fn dump_dir_is_empty(&self) -> bool {
        std::fs::read_dir(self._dumps.path()).unwrap().next().is_none()
    }
}

pub fn alert(alertname: &str, pod: &str, team: &str) -> Value {
    json!({
        "status": "firing",
        "labels": {
            "alertname": alertname,
            "priority": "P1",
            "pod_name": pod,
            "namespace": "prod",
            "techteam": team,
            "self_healing": "true"
        },
        "annotations": {}
    })
}

pub fn payload(alerts: Vec<Value>) -> Value {
    json!({
        "receiver": "selfheal",
        "status": "firing",
        "alerts": alerts,
        "groupKey": "{}:{alertname=\"pod cpu high\"}",
        "version": "4"
    })
}
