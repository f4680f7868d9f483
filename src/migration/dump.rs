use crate::{MigrateError, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Commands fed to the sqlite3 shell on stdin
const DUMP_COMMANDS: &[u8] = b".dump\n.quit\n";

/// Runs the `sqlite3` command line shell to produce a textual dump
pub struct SqliteDumper {
    program: String,
    timeout: Duration,
}

impl SqliteDumper {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }

    /// Make sure the tool answers `--version`; returns its version line
    pub async fn check_available(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| MigrateError::DumpTimeout(self.timeout))?
            .map_err(|e| MigrateError::DumpTool(format!("{}: {} - is it installed?", self.program, e)))?;

        if !output.status.success() {
            return Err(MigrateError::DumpTool(format!(
                "{} --version exited with {}",
                self.program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Dump `db_file`. The child is killed if it does not finish in time.
    pub async fn dump(&self, db_file: &Path) -> Result<String> {
        let mut child = Command::new(&self.program)
            .arg(db_file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MigrateError::DumpTool(format!("failed to start {}: {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MigrateError::DumpTool("stdin of the dump tool is not available".to_string()))?;
        let writer = tokio::spawn(async move {
            // Dropping stdin afterwards closes the pipe
            stdin.write_all(DUMP_COMMANDS).await
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MigrateError::DumpTimeout(self.timeout))??;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Could not write commands to {}: {}", self.program, e),
            Err(e) => warn!("Command writer for {} failed: {}", self.program, e),
        }

        if !output.status.success() {
            return Err(MigrateError::DumpTool(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let dump = String::from_utf8(output.stdout)
            .map_err(|e| MigrateError::DumpTool(format!("dump is not valid UTF-8: {e}")))?;
        debug!("Dump tool produced {} bytes", dump.len());
        Ok(dump)
    }
}
