//! Process supervision
//!
//! One call, one child process:
//!
//! 1. persist the script ([`ScriptArtifact`])
//! 2. spawn `<interpreter> <script>` with piped stdout/stderr, and a piped
//!    stdin only when there is a payload to stream
//! 3. write the payload and drain both output streams on independent tasks
//! 4. race exit plus draining against one deadline armed at call start;
//!    on timeout kill and reap
//! 5. delete the script and classify the outcome

use crate::artifact::ScriptArtifact;
use crate::error::ExecutionError;
use crate::settings::ExecutionSettings;
use async_trait::async_trait;
use scriptbridge_script::SynthesizedScript;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs a synthesized script and returns its trimmed stdout
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(
        &self,
        script: &SynthesizedScript,
        settings: &ExecutionSettings,
    ) -> Result<String, ExecutionError>;
}

/// [`ScriptRunner`] backed by a real interpreter process
#[derive(Debug, Default, Clone)]
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self
    }

    async fn run_script(
        &self,
        script_path: &Path,
        payload: Option<&str>,
        settings: &ExecutionSettings,
        deadline: Instant,
    ) -> Result<String, ExecutionError> {
        let mut command = Command::new(&settings.interpreter_path);
        command
            .arg(script_path)
            .stdin(if payload.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| {
            error!(
                interpreter = %settings.interpreter_path,
                error = %source,
                "Failed to start interpreter"
            );
            ExecutionError::Spawn {
                interpreter: settings.interpreter_path.clone(),
                source,
            }
        })?;

        let pid = child.id();
        debug!(
            pid = ?pid,
            interpreter = %settings.interpreter_path,
            script = %script_path.display(),
            "Spawned interpreter"
        );

        let mut stdin_task = tokio::spawn(write_stdin(
            child.stdin.take(),
            payload.map(str::to_owned),
        ));
        let mut stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let mut stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        // The deadline covers exit and draining together: a descendant that
        // inherits the pipes must not keep the call alive past the budget.
        let completion = async {
            let status = child.wait().await.map_err(|e| {
                ExecutionError::Process(format!("Failed to wait for interpreter: {}", e))
            })?;
            // The stdin writer only logs; its result does not affect the outcome.
            let _ = (&mut stdin_task).await;
            let stdout = join_stream(&mut stdout_task, "stdout").await?;
            let stderr = join_stream(&mut stderr_task, "stderr").await?;
            Ok::<_, ExecutionError>((status, stdout, stderr))
        };

        let (status, stdout, stderr) = match tokio::time::timeout_at(deadline, completion).await {
            Ok(Ok(finished)) => finished,
            Ok(Err(e)) => {
                stdin_task.abort();
                stdout_task.abort();
                stderr_task.abort();
                return Err(e);
            }
            Err(_) => {
                warn!(
                    pid = ?pid,
                    timeout_ms = settings.timeout_ms(),
                    "Script timed out, killing interpreter"
                );
                if let Err(e) = child.start_kill() {
                    debug!(pid = ?pid, error = %e, "Kill failed, process already exited");
                }
                // Reap so no zombie outlives the call; the exit status is ignored.
                if let Err(e) = child.wait().await {
                    warn!(pid = ?pid, error = %e, "Failed to reap killed interpreter");
                }
                stdin_task.abort();
                stdout_task.abort();
                stderr_task.abort();
                return Err(ExecutionError::Timeout {
                    timeout_ms: settings.timeout_ms(),
                });
            }
        };

        classify(status, &stdout, &stderr)
    }
}

#[async_trait]
impl ScriptRunner for ProcessSupervisor {
    async fn run(
        &self,
        script: &SynthesizedScript,
        settings: &ExecutionSettings,
    ) -> Result<String, ExecutionError> {
        let deadline = Instant::now() + settings.timeout;
        let artifact =
            ScriptArtifact::write(&settings.scratch_dir, &settings.script_prefix, &script.source)?;

        let result = self
            .run_script(
                artifact.path(),
                script.stdin_payload.as_deref(),
                settings,
                deadline,
            )
            .await;

        artifact.cleanup();
        result
    }
}

/// Turn the exit status and captured streams into the call's result
fn classify(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Result<String, ExecutionError> {
    let stdout = String::from_utf8_lossy(stdout).trim().to_string();

    if status.success() {
        info!(stdout_len = stdout.len(), "Script completed");
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    let diagnostic = if stderr.is_empty() { stdout } else { stderr };

    warn!(exit_code = ?status.code(), "Script exited with failure");
    Err(ExecutionError::Runtime {
        code: status.code(),
        status: describe_status(status),
        stderr: diagnostic,
    })
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

async fn write_stdin(stdin: Option<ChildStdin>, payload: Option<String>) {
    let (Some(mut stdin), Some(payload)) = (stdin, payload) else {
        return;
    };

    if let Err(e) = stdin.write_all(payload.as_bytes()).await {
        // The script may exit without reading its input.
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            debug!("Interpreter closed stdin before the payload was written");
        } else {
            warn!(error = %e, "Failed to write payload to interpreter");
        }
        return;
    }

    if let Err(e) = stdin.shutdown().await {
        debug!(error = %e, "Failed to close interpreter stdin");
    }
}

async fn read_stream<R>(stream: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}

async fn join_stream(
    task: &mut JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, ExecutionError> {
    match task.await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(ExecutionError::Process(format!("Failed to read {}: {}", name, e))),
        Err(e) => Err(ExecutionError::Process(format!("{} reader failed: {}", name, e))),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use scriptbridge_config::ExecutionConfig;
    use std::time::{Duration, Instant};
    use tokio::task::JoinSet;

    fn settings(scratch: &Path, timeout_ms: u64) -> ExecutionSettings {
        let config = ExecutionConfig {
            interpreter_path: "/bin/sh".to_string(),
            timeout: Duration::from_millis(timeout_ms),
            scratch_dir: Some(scratch.to_path_buf()),
            ..ExecutionConfig::default()
        };
        ExecutionSettings::from(&config)
    }

    fn shell(source: &str) -> SynthesizedScript {
        SynthesizedScript {
            source: source.to_string(),
            stdin_payload: None,
        }
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_success_returns_trimmed_stdout() {
        let scratch = tempfile::tempdir().unwrap();
        let output = ProcessSupervisor::new()
            .run(&shell("echo '  {\"a\": 1}  '\n"), &settings(scratch.path(), 5_000))
            .await
            .unwrap();

        assert_eq!(output, "{\"a\": 1}");
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_payload_streamed_on_stdin() {
        let scratch = tempfile::tempdir().unwrap();
        let script = SynthesizedScript {
            source: "cat\n".to_string(),
            stdin_payload: Some("{\"input\": {\"q\": 1}}".to_string()),
        };

        let output = ProcessSupervisor::new()
            .run(&script, &settings(scratch.path(), 5_000))
            .await
            .unwrap();
        assert_eq!(output, "{\"input\": {\"q\": 1}}");
    }

    #[tokio::test]
    async fn test_no_payload_means_empty_stdin() {
        let scratch = tempfile::tempdir().unwrap();
        let output = ProcessSupervisor::new()
            .run(&shell("cat\necho done\n"), &settings(scratch.path(), 5_000))
            .await
            .unwrap();
        assert_eq!(output, "done");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let scratch = tempfile::tempdir().unwrap();
        let err = ProcessSupervisor::new()
            .run(
                &shell("echo partial\necho 'boom' >&2\nexit 3\n"),
                &settings(scratch.path(), 5_000),
            )
            .await
            .unwrap_err();

        match err {
            ExecutionError::Runtime { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_empty_stderr_falls_back_to_stdout() {
        let scratch = tempfile::tempdir().unwrap();
        let err = ProcessSupervisor::new()
            .run(&shell("echo 'only stdout'\nexit 1\n"), &settings(scratch.path(), 5_000))
            .await
            .unwrap_err();

        match err {
            ExecutionError::Runtime { stderr, .. } => assert_eq!(stderr, "only stdout"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_child_and_cleans_up() {
        let scratch = tempfile::tempdir().unwrap();
        let marker = tempfile::tempdir().unwrap();
        let pid_file = marker.path().join("pid");
        let source = format!("echo $$ > '{}'\nexec sleep 30\n", pid_file.display());

        let started = Instant::now();
        let err = ProcessSupervisor::new()
            .run(&shell(&source), &settings(scratch.path(), 300))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Timeout { timeout_ms: 300 }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(scratch_is_empty(scratch.path()));

        #[cfg(target_os = "linux")]
        {
            let pid = std::fs::read_to_string(&pid_file).unwrap();
            let proc_entry = Path::new("/proc").join(pid.trim());
            assert!(!proc_entry.exists(), "interpreter {} still running", pid.trim());
        }
    }

    #[tokio::test]
    async fn test_deadline_covers_inherited_pipes() {
        let scratch = tempfile::tempdir().unwrap();

        // The background sleep keeps stdout open after the shell exits.
        let started = Instant::now();
        let err = ProcessSupervisor::new()
            .run(&shell("sleep 3 &\necho hi\n"), &settings(scratch.path(), 300))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Timeout { timeout_ms: 300 }));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let scratch = tempfile::tempdir().unwrap();
        let mut settings = settings(scratch.path(), 5_000);
        settings.interpreter_path = "/nonexistent/bin/python-missing".to_string();

        let err = ProcessSupervisor::new()
            .run(&shell("echo hi\n"), &settings)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Spawn { .. }));
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_large_output_on_both_streams() {
        let scratch = tempfile::tempdir().unwrap();
        let payload = "x".repeat(1 << 20);
        let script = SynthesizedScript {
            source: "head -c 300000 /dev/zero | tr '\\000' 'e' >&2\ncat\n".to_string(),
            stdin_payload: Some(payload.clone()),
        };

        let output = ProcessSupervisor::new()
            .run(&script, &settings(scratch.path(), 20_000))
            .await
            .unwrap();
        assert_eq!(output.len(), payload.len());
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let scratch = tempfile::tempdir().unwrap();
        let mut calls = JoinSet::new();

        for i in 0..8u32 {
            let settings = settings(scratch.path(), 10_000);
            let source = format!("sleep 0.{}\necho {}\n", 8 - i, i);
            calls.spawn(async move {
                let output = ProcessSupervisor::new().run(&shell(&source), &settings).await;
                (i, output)
            });
        }

        let mut seen = 0;
        while let Some(joined) = calls.join_next().await {
            let (i, output) = joined.unwrap();
            assert_eq!(output.unwrap(), i.to_string());
            seen += 1;
        }
        assert_eq!(seen, 8);
        assert!(scratch_is_empty(scratch.path()));
    }
}
