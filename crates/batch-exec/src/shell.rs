use std::{path::PathBuf, process::Stdio, sync::Arc, time::Duration};

use batch_core::ExecutionRecord;
use batch_model::ExecutionState;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::{
    error::{ExecError, ExecResult},
    util::{drain, kill_graceful, shell_command},
};

/// Process settings shared by every execution.
#[derive(Clone, Debug)]
pub struct ShellConfig {
    /// Working directory; inherits the worker's when `None`.
    pub cwd: Option<PathBuf>,
    /// Extra environment, applied after the execution variables.
    pub env: Vec<(String, String)>,
    /// Time between SIGTERM and SIGKILL on cancellation.
    pub kill_grace: Duration,
    /// Upper bound for collecting output once the process is gone.
    pub drain_timeout: Duration,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            cwd: None,
            env: Vec::new(),
            kill_grace: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(2),
        }
    }
}

/// Runs a batch task's script in the platform shell (`sh -c` / `cmd /C`)
/// and drives its execution record to a terminal state.
#[derive(Clone, Debug, Default)]
pub struct ShellExecutor {
    cfg: ShellConfig,
}

impl ShellExecutor {
    pub fn new(cfg: ShellConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.cfg
    }

    /// Execute `script` against `record`.
    ///
    /// `Pending -> Running` on entry; `Succeeded` on exit code 0, `Failed` on a
    /// non-zero exit or a spawn error, `Aborted` when `cancel` fires. Stdout and
    /// stderr lines are appended to the record's log. Errors are returned only
    /// when the record itself refuses a transition.
    #[instrument(level = "debug", skip_all, fields(project = %record.project(), task = %record.task(), seq = record.seq()))]
    pub async fn execute(
        &self,
        record: Arc<ExecutionRecord>,
        script: &str,
        cancel: CancellationToken,
    ) -> ExecResult<ExecutionState> {
        record.start()?;

        if script.trim().is_empty() {
            record.append_log(ExecError::EmptyScript.to_string())?;
            record.finish(ExecutionState::Failed)?;
            return Ok(ExecutionState::Failed);
        }

        let mut cmd = shell_command(script);
        cmd.env("BATCH_PROJECT", record.project().as_str())
            .env("BATCH_TASK", record.task())
            .env("BATCH_BUILD_NUMBER", record.build().number.to_string())
            .env("BATCH_EXECUTION", record.seq().to_string());
        for (k, v) in &self.cfg.env {
            cmd.env(k, v);
        }
        if let Some(cwd) = &self.cfg.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        trace!(target: "batch.exec.shell", %script, "spawn");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = ExecError::Spawn(e.to_string());
                warn!(target: "batch.exec.shell", error = %err, "spawn failed");
                record.append_log(err.to_string())?;
                record.finish(ExecutionState::Failed)?;
                return Ok(ExecutionState::Failed);
            }
        };

        let mut readers = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            readers.push(capture(out, Arc::clone(&record)));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(capture(err, Arc::clone(&record)));
        }

        let outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) if status.success() => {
                    debug!(target: "batch.exec.shell", "exit success");
                    ExecutionState::Succeeded
                }
                Ok(status) => {
                    drain(std::mem::take(&mut readers), self.cfg.drain_timeout).await;
                    let line = match status.code() {
                        Some(code) => format!("exit code: {code}"),
                        None => "terminated by signal".to_string(),
                    };
                    debug!(target: "batch.exec.shell", %line, "exit non-zero");
                    record.append_log(line)?;
                    ExecutionState::Failed
                }
                Err(e) => {
                    drain(std::mem::take(&mut readers), self.cfg.drain_timeout).await;
                    record.append_log(ExecError::from(e).to_string())?;
                    ExecutionState::Failed
                }
            },
            _ = cancel.cancelled() => {
                debug!(target: "batch.exec.shell", "cancelled; killing child");
                if let Err(e) = kill_graceful(&mut child, self.cfg.kill_grace).await {
                    warn!(target: "batch.exec.shell", error = %e, "kill failed");
                }
                drain(std::mem::take(&mut readers), self.cfg.drain_timeout).await;
                record.append_log("aborted")?;
                ExecutionState::Aborted
            }
        };

        drain(readers, self.cfg.drain_timeout).await;
        record.finish(outcome)?;
        Ok(outcome)
    }
}

fn capture<R>(stream: R, record: Arc<ExecutionRecord>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if record.append_log(line).is_err() {
                break;
            }
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use batch_core::{RunLog, TaskRegistry};
    use batch_model::{BatchTaskSpec, BuildId, ProjectName};

    fn record() -> Arc<ExecutionRecord> {
        let task = TaskRegistry::new(ProjectName::from("app"), [BatchTaskSpec::new("t", "")])
            .find("t")
            .unwrap();
        RunLog::new(BuildId::new("app", 4)).allocate_record(&task)
    }

    #[tokio::test]
    async fn success_captures_output() {
        let rec = record();
        let state = ShellExecutor::default()
            .execute(rec.clone(), "echo hello; echo oops >&2", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state, ExecutionState::Succeeded);
        let info = rec.info();
        assert_eq!(info.state, ExecutionState::Succeeded);
        assert!(info.started_at.is_some());
        assert!(info.completed_at.is_some());
        assert!(info.log.iter().any(|l| l == "hello"));
        assert!(info.log.iter().any(|l| l == "oops"));
    }

    #[tokio::test]
    async fn non_zero_exit_fails() {
        let rec = record();
        let state = ShellExecutor::default()
            .execute(rec.clone(), "exit 3", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state, ExecutionState::Failed);
        assert_eq!(rec.info().log.last().map(String::as_str), Some("exit code: 3"));
    }

    #[tokio::test]
    async fn empty_script_fails_without_spawning() {
        let rec = record();
        let state = ShellExecutor::default()
            .execute(rec.clone(), "   ", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state, ExecutionState::Failed);
        assert_eq!(rec.info().log, ["empty script"]);
    }

    #[tokio::test]
    async fn execution_variables_are_exported() {
        let rec = record();
        ShellExecutor::default()
            .execute(
                rec.clone(),
                "echo \"$BATCH_PROJECT/$BATCH_TASK/$BATCH_BUILD_NUMBER/$BATCH_EXECUTION\"",
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(rec.info().log, ["app/t/4/1"]);
    }

    #[tokio::test]
    async fn cancellation_aborts() {
        let rec = record();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let exec = ShellExecutor::new(ShellConfig {
            kill_grace: Duration::from_millis(200),
            ..ShellConfig::default()
        });
        let state = exec.execute(rec.clone(), "sleep 30", cancel).await.unwrap();

        assert_eq!(state, ExecutionState::Aborted);
        assert_eq!(rec.state(), ExecutionState::Aborted);
    }

    #[tokio::test]
    async fn record_can_only_run_once() {
        let rec = record();
        let exec = ShellExecutor::default();
        exec.execute(rec.clone(), "true", CancellationToken::new())
            .await
            .unwrap();

        let err = exec
            .execute(rec, "true", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Record(_)));
    }
}
