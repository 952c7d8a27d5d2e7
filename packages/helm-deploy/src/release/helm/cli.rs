//! Helm CLI
//!
//! Implementation of ReleaseManager that shells out to the `helm` binary.
//! Output is forwarded line by line to our own stdout/stderr while the
//! process runs; the last lines are kept for error reporting.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::HelmError;
use crate::release::adapter::{uninstall_args, ReleaseManager, ReleaseSpec};

/// Lines of combined output kept for error messages
const OUTPUT_TAIL_LINES: usize = 20;

/// Bounded buffer holding the most recent output lines of both streams
#[derive(Clone)]
struct OutputTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl OutputTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    fn render(&self) -> String {
        let lines = self.lines.lock();
        lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Copy `reader` to `writer` a line at a time, recording each line
///
/// Bytes are passed through unchanged; the tail keeps a lossy UTF-8 copy.
/// If writing fails the rest of the stream is still read and discarded so
/// helm never writes into a closed pipe.
async fn forward<R, W>(reader: R, mut writer: W, tail: OutputTail) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let copied = copy_lines(&mut reader, &mut writer, &tail).await;
    if copied.is_err() {
        tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    }
    copied
}

async fn copy_lines<R, W>(reader: &mut R, writer: &mut W, tail: &OutputTail) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&line);
        tail.push(text.trim_end_matches(&['\n', '\r'][..]).to_string());

        writer.write_all(&line).await?;
        writer.flush().await?;
    }
}

/// Helm release manager
pub struct HelmCli {
    binary: String,
    timeout: Option<Duration>,
}

impl HelmCli {
    /// Use a specific helm executable
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kill helm if it runs longer than `limit`
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    /// Get the executable this manager runs
    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn run(&self, args: &[String]) -> Result<(), HelmError> {
        info!(command = %format!("{} {}", self.binary, args.join(" ")), "Running helm");

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HelmError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let tail = OutputTail::new(OUTPUT_TAIL_LINES);
        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward(out, tokio::io::stdout(), tail.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward(err, tokio::io::stderr(), tail.clone())));

        let status = match self.timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(limit_secs = limit.as_secs(), "Helm timed out, killing it");
                    child.kill().await.ok();
                    return Err(HelmError::TimedOut {
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait().await?,
        };

        // Drain whatever is still buffered in the pipes
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            match task.await {
                Ok(Err(e)) => debug!(error = %e, "Failed to forward helm output"),
                Err(e) => debug!(error = %e, "Helm output task panicked"),
                Ok(Ok(())) => {}
            }
        }

        if !status.success() {
            return Err(HelmError::Exited {
                code: status.code(),
                output: tail.render(),
            });
        }

        debug!("Helm finished successfully");
        Ok(())
    }
}

#[async_trait]
impl ReleaseManager for HelmCli {
    async fn install(&self, spec: &ReleaseSpec) -> Result<(), HelmError> {
        self.run(&spec.upgrade_args()).await
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<(), HelmError> {
        self.run(&uninstall_args(release_name, namespace)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_tail_keeps_latest_lines() {
        let tail = OutputTail::new(2);
        tail.push("one".to_string());
        tail.push("two".to_string());
        tail.push("three".to_string());
        assert_eq!(tail.render(), "two\nthree");
    }

    #[tokio::test]
    async fn test_forward_passes_raw_bytes() {
        let tail = OutputTail::new(OUTPUT_TAIL_LINES);
        let input: &[u8] = b"caf\xe9\r\nplain\nno newline";
        let mut out = Vec::new();

        forward(input, &mut out, tail.clone()).await.unwrap();

        assert_eq!(out, input);
        assert_eq!(tail.render(), "caf\u{FFFD}\nplain\nno newline");
    }

    #[tokio::test]
    async fn test_forward_drains_after_write_failure() {
        struct Closed;

        impl AsyncWrite for Closed {
            fn poll_write(
                self: std::pin::Pin<&mut Self>,
                _: &mut std::task::Context<'_>,
                _: &[u8],
            ) -> std::task::Poll<std::io::Result<usize>> {
                std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
            }

            fn poll_flush(
                self: std::pin::Pin<&mut Self>,
                _: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }

            fn poll_shutdown(
                self: std::pin::Pin<&mut Self>,
                _: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }
        }

        let (mut helm_side, our_side) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            // far more than the duplex buffer, so it only finishes if drained
            helm_side.write_all(&vec![b'x'; 256 * 1024]).await
        });

        let err = forward(our_side, Closed, OutputTail::new(OUTPUT_TAIL_LINES))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
        writer.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let helm = HelmCli::with_binary("/nonexistent/helm-binary");
        let err = helm.uninstall("web", "apps").await.unwrap_err();
        assert!(matches!(err, HelmError::Spawn { .. }));
    }

    #[cfg(unix)]
    mod script {
        use super::*;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Write a shell script standing in for helm
        fn fake_helm(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("helm");
            {
                let mut file = std::fs::File::create(&path).unwrap();
                writeln!(file, "#!/bin/sh").unwrap();
                writeln!(file, "{}", body).unwrap();
                file.sync_all().unwrap();
            }
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path.to_string_lossy().to_string()
        }

        fn spec() -> ReleaseSpec {
            ReleaseSpec {
                release_name: "web".to_string(),
                chart: "charts/web".to_string(),
                chart_version: "1.4.0".to_string(),
                namespace: "apps".to_string(),
                values_file: "values.yaml".to_string(),
                overrides: vec![],
            }
        }

        #[tokio::test]
        async fn test_install_success() {
            let dir = TempDir::new().unwrap();
            let helm = HelmCli::with_binary(fake_helm(&dir, "echo \"$@\"\nexit 0"));
            helm.install(&spec()).await.unwrap();
        }

        #[tokio::test]
        async fn test_exit_code_and_output_are_reported() {
            let dir = TempDir::new().unwrap();
            let helm = HelmCli::with_binary(fake_helm(
                &dir,
                "echo \"$@\"\necho 'Error: UPGRADE FAILED' >&2\nexit 3",
            ));

            match helm.install(&spec()).await.unwrap_err() {
                HelmError::Exited { code, output } => {
                    assert_eq!(code, Some(3));
                    assert!(output.contains("upgrade web charts/web --install --atomic"));
                    assert!(output.contains("Error: UPGRADE FAILED"));
                }
                other => panic!("Expected exit error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_uninstall_passes_arguments() {
            let dir = TempDir::new().unwrap();
            let helm = HelmCli::with_binary(fake_helm(&dir, "echo \"$@\"\nexit 1"));

            match helm.uninstall("web", "apps").await.unwrap_err() {
                HelmError::Exited { output, .. } => {
                    assert_eq!(output, "uninstall web --namespace apps");
                }
                other => panic!("Expected exit error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_non_utf8_output_does_not_fail_helm() {
            let dir = TempDir::new().unwrap();
            let helm = HelmCli::with_binary(fake_helm(
                &dir,
                "printf 'caf\\351\\n'\n\
                 i=0\n\
                 while [ $i -lt 2000 ]; do echo \"release output line $i ..........................\"; i=$((i+1)); done\n\
                 exit 0",
            ));

            helm.uninstall("web", "apps").await.unwrap();
        }

        #[tokio::test]
        async fn test_non_utf8_output_kept_in_tail() {
            let dir = TempDir::new().unwrap();
            let helm = HelmCli::with_binary(fake_helm(&dir, "printf 'caf\\351\\n' >&2\nexit 3"));

            match helm.uninstall("web", "apps").await.unwrap_err() {
                HelmError::Exited { code, output } => {
                    assert_eq!(code, Some(3));
                    assert_eq!(output, "caf\u{FFFD}");
                }
                other => panic!("Expected exit error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_timeout_kills_helm() {
            let dir = TempDir::new().unwrap();
            let helm = HelmCli::with_binary(fake_helm(&dir, "exec sleep 30"))
                .with_timeout(Some(Duration::from_millis(200)));

            let err = helm.uninstall("web", "apps").await.unwrap_err();
            assert!(matches!(err, HelmError::TimedOut { .. }));
        }
    }
}
