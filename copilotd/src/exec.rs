// ABOUTME: runs EXECUTE commands through the host shell behind a swappable trait.
// ABOUTME: captures exit status and output so failures become reply text, not protocol errors.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

#[derive(Debug)]
pub struct ExecOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the dispatcher and the host OS. Swapping the runner (for an
/// allow-listed or sandboxed one) must not touch classification.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> anyhow::Result<ExecOutput>;
}

/// Runs the command line with full shell interpretation. The only caller is
/// the local shell integration, so the line is trusted input.
pub struct ShellRunner {
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Bounds the wall-clock runtime of each command. Unbounded when unset.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> anyhow::Result<ExecOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| anyhow::anyhow!("command timed out after {}s", limit.as_secs()))??,
            None => cmd.output().await?,
        };

        Ok(ExecOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let output = ShellRunner::new().run("echo hi").await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "hi\n");
    }

    #[tokio::test]
    async fn reports_failure_with_stderr() {
        let output = ShellRunner::new()
            .run("echo boom >&2; exit 3")
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.stderr, "boom\n");
    }

    #[tokio::test]
    async fn missing_binary_fails_inside_the_shell() {
        let output = ShellRunner::new()
            .run("definitely-not-a-real-binary-xyz")
            .await
            .unwrap();
        assert!(!output.success);
        assert!(!output.stderr.is_empty());
    }

    #[tokio::test]
    async fn empty_command_succeeds_with_no_output() {
        let output = ShellRunner::new().run("").await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "");
    }

    #[tokio::test]
    async fn timeout_cuts_off_long_commands() {
        let err = ShellRunner::with_timeout(Duration::from_secs(1))
            .run("sleep 5")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
