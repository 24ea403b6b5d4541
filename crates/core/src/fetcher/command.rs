//! Fetcher that delegates to an external downloader program.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use super::error::FetchError;
use super::traits::ContentFetcher;

/// Runs a configured program once per attempt.
///
/// Arguments may contain `{url}` and `{dest}` placeholders. The program runs
/// with the destination directory as its working directory and is killed if
/// it outlives the timeout.
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

/// Longest stderr tail kept in an error.
const STDERR_TAIL: usize = 500;

impl CommandFetcher {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Arguments with placeholders substituted.
    pub fn render_args(&self, url: &str, dest_dir: &Path) -> Vec<String> {
        let dest = dest_dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{url}", url).replace("{dest}", &dest))
            .collect()
    }
}

fn tail(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().rev().nth(STDERR_TAIL - 1) {
        Some((idx, _)) => format!("...{}", &trimmed[idx..]),
        None => trimmed.to_string(),
    }
}

#[async_trait]
impl ContentFetcher for CommandFetcher {
    fn name(&self) -> &str {
        "command"
    }

    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), FetchError> {
        fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| FetchError::io(dest_dir, e))?;

        let args = self.render_args(url, dest_dir);
        debug!(program = %self.program, ?args, "spawning downloader");

        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(dest_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FetchError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| FetchError::Spawn {
                program: self.program.clone(),
                source: e,
            })?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(FetchError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: tail(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        Ok(())
    }
}
