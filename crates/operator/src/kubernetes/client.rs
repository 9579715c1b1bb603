use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, AttachParams, DeleteParams},
    Client,
};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::{Orchestrator, PodExec, PodState};
use crate::{Error, Result};

pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Uses in-cluster config when available, falling back to the local kubeconfig.
    pub async fn new() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn run_streaming<W>(
        &self,
        namespace: &str,
        name: &str,
        command: Vec<String>,
        sink: &mut W,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let description = command.join(" ");
        debug!("Executing `{}` in pod {}/{}", description, namespace, name);

        let params = AttachParams::default().stdin(false).stdout(true).stderr(true);
        let mut process = self
            .pods(namespace)
            .exec(name, command, &params)
            .await
            .map_err(|e| {
                Error::CaptureCommand(format!("failed to start `{}` in {}/{}: {}", description, namespace, name, e))
            })?;

        let status = process.take_status();
        let stdout = process.stdout();
        let stderr = process.stderr();

        let (copied, stderr_text) = tokio::join!(drain_into(stdout, sink), read_to_string(stderr));
        let bytes = copied?;

        let status = match status {
            Some(status) => status.await,
            None => None,
        };
        process
            .join()
            .await
            .map_err(|e| Error::CaptureCommand(format!("`{}` did not terminate cleanly: {}", description, e)))?;

        match status {
            Some(s) if s.status.as_deref() == Some("Success") => {
                debug!("`{}` in {}/{} wrote {} bytes", description, namespace, name, bytes);
                Ok(())
            }
            Some(s) => Err(Error::CaptureCommand(format!(
                "`{}` failed in {}/{}: {} {}",
                description,
                namespace,
                name,
                s.message.unwrap_or_default(),
                stderr_text.trim()
            ))),
            None => Err(Error::CaptureCommand(format!(
                "`{}` in {}/{} exited without reporting a status",
                description, namespace, name
            ))),
        }
    }
}

async fn drain_into<R, W>(reader: Option<R>, sink: &mut W) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(0);
    };
    let copied = tokio::io::copy(&mut reader, sink).await?;
    sink.flush().await?;
    Ok(copied)
}

async fn read_to_string<R>(reader: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut out = String::new();
    if let Some(mut reader) = reader {
        let _ = reader.read_to_string(&mut out).await;
    }
    out
}

#[async_trait]
impl Orchestrator for KubeClient {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<PodState>> {
        match self.pods(namespace).get_opt(name).await {
            Ok(Some(pod)) => Ok(Some(pod_state(&pod))),
            Ok(None) => Ok(None),
            Err(e) => Err(Error::Lookup(format!(
                "failed to read pod {}/{}: {}",
                namespace, name, e
            ))),
        }
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        self.pods(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| Error::Remediation(format!("failed to delete pod {}/{}: {}", namespace, name, e)))?;
        info!("Deleted pod {}/{}", namespace, name);
        Ok(())
    }
}

#[async_trait]
impl PodExec for KubeClient {
    async fn exec_to_file(
        &self,
        namespace: &str,
        name: &str,
        command: Vec<String>,
        dest: &Path,
    ) -> Result<()> {
        let mut file = tokio::fs::File::create(dest).await?;
        self.run_streaming(namespace, name, command, &mut file).await
    }

    async fn exec(&self, namespace: &str, name: &str, command: Vec<String>) -> Result<()> {
        let mut sink = tokio::io::sink();
        self.run_streaming(namespace, name, command, &mut sink).await
    }

    async fn copy_from_pod(
        &self,
        namespace: &str,
        name: &str,
        remote_path: &str,
        dest: &Path,
    ) -> Result<()> {
        let command = vec!["cat".to_string(), remote_path.to_string()];
        self.exec_to_file(namespace, name, command, dest).await
    }
}

/// Maps every declared container to the readiness its status reports.
pub fn pod_state(pod: &Pod) -> PodState {
    let status = pod.status.as_ref();
    let statuses = status
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();
    let declared = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.as_slice())
        .unwrap_or_default();

    PodState {
        phase: status.and_then(|s| s.phase.clone()),
        containers_ready: declared
            .iter()
            .map(|container| {
                statuses
                    .iter()
                    .any(|s| s.name == container.name && s.ready)
            })
            .collect(),
    }
}
