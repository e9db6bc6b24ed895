//! Running external commands.

use std::future::Future;
use std::io;

use tokio::process::Command;

/// Runs a program and returns its textual output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> impl Future<Output = io::Result<String>> + Send;
}

/// [`CommandRunner`] that spawns real processes.
///
/// Stdout comes first, followed by whatever the program wrote to stderr. A
/// non-zero exit status is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let output = Command::new(program).args(args).output().await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                text.trim()
            )));
        }

        tracing::trace!(program, bytes = text.len(), "Command finished");
        Ok(text)
    }
}
