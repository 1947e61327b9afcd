use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubtransError};

/// External backend process invocation
#[derive(Debug, Clone)]
pub struct BackendCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub input: Option<String>,
    pub description: String,
}

impl BackendCommand {
    /// Create a new backend command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            envs: Vec::new(),
            input: None,
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Set an environment variable for the child
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Point the child at a directory through an environment variable
    pub fn env_path<K: Into<String>, P: AsRef<Path>>(self, key: K, path: P) -> Self {
        let value = path.as_ref().to_string_lossy().to_string();
        self.env(key, value)
    }

    /// Text written to the child's stdin
    pub fn stdin<S: Into<String>>(mut self, input: S) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Run the command to completion and return its stdout
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing backend command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if self.input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        if let Some(input) = &self.input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await.map_err(|e| {
                    SubtransError::TranslationFailure(format!(
                        "{} failed: could not write input: {}",
                        self.description, e
                    ))
                })?;
            }
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubtransError::TranslationFailure(format!(
                "{} failed ({}): {}",
                self.description,
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout).map_err(|_| {
            SubtransError::TranslationFailure(format!(
                "{} produced output that is not valid UTF-8",
                self.description
            ))
        })
    }

    fn spawn_error(&self, err: std::io::Error) -> SubtransError {
        if err.kind() == ErrorKind::NotFound {
            SubtransError::BackendUnavailable(format!(
                "{} not available: {}",
                self.binary_path, err
            ))
        } else {
            SubtransError::TranslationFailure(format!(
                "Failed to execute {}: {}",
                self.binary_path, err
            ))
        }
    }
}
