//! Launching pipeline runs as child processes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context};
use reportsync_core::{AppConfig, ReportKind};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

const CLI_BIN_NAME: &str = "reportsync-cli";

/// Starts one pipeline run without waiting for it.
pub(crate) trait Dispatcher {
    fn dispatch(&self, report: ReportKind) -> anyhow::Result<()>;
}

/// Runs `<program> run <report>` as a fresh process per dispatch.
#[derive(Debug, Clone)]
pub(crate) struct ProcessDispatcher {
    program: PathBuf,
}

impl ProcessDispatcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `REPORTSYNC_CLI_BIN` when set, otherwise the `reportsync-cli`
    /// binary next to the running scheduler.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.cli_bin {
            Some(program) => Ok(Self::new(program.clone())),
            None => Ok(Self::new(sibling_cli_bin()?)),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

fn sibling_cli_bin() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the scheduler executable")?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow!("scheduler executable {} has no parent", exe.display()))?;
    Ok(dir.join(format!("{CLI_BIN_NAME}{}", std::env::consts::EXE_SUFFIX)))
}

impl Dispatcher for ProcessDispatcher {
    fn dispatch(&self, report: ReportKind) -> anyhow::Result<()> {
        let mut child = Command::new(&self.program)
            .arg("run")
            .arg(report.as_str())
            .env("NO_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        tracing::info!(report = %report, pid = child.id(), "dispatched pipeline");

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(report, out, OutputStream::Stdout)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(report, err, OutputStream::Stderr)));

        tokio::spawn(async move {
            let status = child.wait().await;
            for forwarder in [stdout, stderr].into_iter().flatten() {
                if let Err(e) = forwarder.await {
                    tracing::warn!(report = %report, error = %e, "output forwarder failed");
                }
            }
            match status {
                Ok(status) if status.success() => {
                    tracing::info!(report = %report, "pipeline finished");
                }
                Ok(status) => {
                    tracing::error!(report = %report, status = %status, "pipeline exited with failure");
                }
                Err(e) => {
                    tracing::error!(report = %report, error = %e, "failed to wait for pipeline");
                }
            }
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Log each line of a child stream as it arrives: stdout at info, stderr at error.
async fn forward_lines<R>(report: ReportKind, stream: R, kind: OutputStream)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(stream).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(segment)) => {
                let Some(line) = clean_line(&segment) else {
                    continue;
                };
                match kind {
                    OutputStream::Stdout => tracing::info!(report = %report, "{line}"),
                    OutputStream::Stderr => tracing::error!(report = %report, "{line}"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(report = %report, error = %e, "failed to read pipeline output");
                break;
            }
        }
    }
}

/// Lossy UTF-8 with trailing whitespace removed; `None` for blank lines.
fn clean_line(bytes: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(bytes);
    let line = line.trim_end();
    (!line.is_empty()).then(|| line.to_string())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use reportsync_core::build_app_config;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn clean_line_trims_and_skips_blanks() {
        assert_eq!(clean_line(b"first  \r").as_deref(), Some("first"));
        assert_eq!(clean_line(b"  second").as_deref(), Some("  second"));
        assert_eq!(clean_line(b"   "), None);
        assert_eq!(clean_line(b""), None);
    }

    #[test]
    fn clean_line_tolerates_invalid_utf8() {
        assert_eq!(clean_line(b"ok \xff").as_deref(), Some("ok \u{fffd}"));
    }

    #[test]
    fn configured_cli_bin_wins() {
        let config = build_app_config(|k| match k {
            "REPORTSYNC_CLI_BIN" => Ok("/opt/reportsync/bin/reportsync-cli".to_string()),
            _ => Err(std::env::VarError::NotPresent),
        })
        .unwrap();
        let dispatcher = ProcessDispatcher::from_config(&config).unwrap();
        assert_eq!(
            dispatcher.program(),
            Path::new("/opt/reportsync/bin/reportsync-cli")
        );
    }

    #[test]
    fn default_cli_bin_sits_next_to_current_exe() {
        let config = build_app_config(|_| Err(std::env::VarError::NotPresent)).unwrap();
        let dispatcher = ProcessDispatcher::from_config(&config).unwrap();
        let exe = std::env::current_exe().unwrap();
        assert_eq!(dispatcher.program().parent(), exe.parent());
        assert!(dispatcher
            .program()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(CLI_BIN_NAME));
    }

    #[tokio::test]
    async fn missing_program_is_a_dispatch_error() {
        let dispatcher = ProcessDispatcher::new("/nonexistent/reportsync-cli");
        let err = dispatcher.dispatch(ReportKind::Analytics).unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dispatch_returns_without_waiting_for_child() {
        let dispatcher = ProcessDispatcher::new("true");
        dispatcher
            .dispatch(ReportKind::BestSelling)
            .expect("spawn should succeed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn child_output_is_logged_while_the_child_is_still_running() {
        use std::os::unix::fs::PermissionsExt;

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-cli");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             echo \"stage failed, retrying after fixed delay ($1 $2)\"\n\
             echo 'database pool timed out' >&2\n\
             sleep 5\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        ProcessDispatcher::new(&script)
            .dispatch(ReportKind::BestSelling)
            .expect("spawn should succeed");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while !logs.text().contains("database pool timed out")
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let text = logs.text();
        let stdout_line = text
            .lines()
            .find(|l| l.contains("stage failed, retrying after fixed delay (run best-selling)"))
            .unwrap_or_else(|| panic!("stdout line not logged yet:\n{text}"));
        assert!(stdout_line.contains("INFO"), "{stdout_line}");
        let stderr_line = text
            .lines()
            .find(|l| l.contains("database pool timed out"))
            .unwrap_or_else(|| panic!("stderr line not logged yet:\n{text}"));
        assert!(stderr_line.contains("ERROR"), "{stderr_line}");
        assert!(!text.contains("pipeline finished"), "{text}");
    }
}
