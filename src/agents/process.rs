//! Agents run as child processes
//!
//! The payload is written to the child's stdin, which is then closed. Stdout
//! and stderr are collected separately until the child exits. A call that
//! outlives its timeout is abandoned and the child is killed.

use std::{ffi::OsString, path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{io::AsyncWriteExt, process::Command};

use super::{Agent, AgentError};

#[derive(Debug, Clone)]
pub struct ProcessAgent {
    name: String,
    program: OsString,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ProcessAgent {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<OsString>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Agent implemented as a script run by an interpreter
    pub fn script(
        name: impl Into<String>,
        interpreter: impl Into<OsString>,
        script: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self::new(name, interpreter, [script.into_os_string()], timeout)
    }

    async fn run(&self, input: Vec<u8>) -> Result<Value, AgentError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AgentError::StartFailed {
                agent: self.name.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| AgentError::StartFailed {
            agent: self.name.clone(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin not captured"),
        })?;

        // Feed stdin while draining the output pipes so a chatty agent cannot
        // block on a full pipe.
        let feed = async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|source| AgentError::StartFailed {
            agent: self.name.clone(),
            source,
        })?;

        if let Err(e) = written {
            // Agents may exit without reading their input
            tracing::debug!("Agent '{}' did not consume its input: {}", self.name, e);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(AgentError::ExecutionFailed {
                agent: self.name.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        if !stderr.is_empty() {
            tracing::debug!("Agent '{}' stderr: {}", self.name, stderr);
        }

        serde_json::from_slice(&output.stdout).map_err(|e| AgentError::InvalidResponse {
            agent: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Agent for ProcessAgent {
    async fn call(&self, payload: Value) -> Result<Value, AgentError> {
        let input = payload.to_string().into_bytes();

        match tokio::time::timeout(self.timeout, self.run(input)).await {
            Ok(result) => result,
            // Dropping the run future drops the child, which kills it
            Err(_) => Err(AgentError::Timeout {
                agent: self.name.clone(),
                after: self.timeout,
            }),
        }
    }
}
