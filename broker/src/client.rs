use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::trace;
use tracing::warn;
use wgctl_protocol::HelperRequest;
use wgctl_protocol::HelperResponse;

use crate::exec;
use crate::exec::ExecError;
use crate::launcher::HelperHandle;
use crate::launcher::HelperSpawner;

/// Bounded retry for launching the helper before a call gives up.
const MAX_SPAWN_ATTEMPTS: usize = 3;
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum BrokerError {
    /// The elevation mechanism was unavailable, the user declined
    /// authentication, or the fresh worker's pipes failed on first use.
    #[error("Failed to start root process.")]
    StartHelper(#[source] std::io::Error),
    /// An established worker produced EOF instead of a response line.
    #[error("Root process exited unexpectedly.")]
    HelperExited,
    /// The channel itself failed: a broken pipe or a response line that does
    /// not decode. Distinct from the invoked command failing.
    #[error("IPC error: {0}")]
    Ipc(String),
    /// The worker could not run the request and said why.
    #[error("{0}")]
    Helper(String),
    /// The invoked program ran and returned a non-zero status.
    #[error("{}", command_failure_message(.exit_code, .stderr))]
    CommandFailed { exit_code: i32, stderr: String },
    #[error(transparent)]
    Exec(#[from] ExecError),
}

// thiserror's `.field` shorthand hands fields over by reference.
#[allow(clippy::trivially_copy_pass_by_ref)]
fn command_failure_message(exit_code: &i32, stderr: &str) -> String {
    if stderr.is_empty() {
        format!("Exit code: {exit_code}")
    } else {
        stderr.to_string()
    }
}

enum ExchangeFailure {
    Eof,
    Transport(std::io::Error),
    MalformedResponse(serde_json::Error),
}

/// The unprivileged side's half of the protocol.
///
/// Owns the single helper handle for the life of the application: lazily
/// spawned on the first privileged call, probed for liveness and re-spawned if
/// it is observed dead, never duplicated. All privileged calls serialize on
/// the internal mutex, which is held across the write-then-read pair – the
/// protocol has no request identifiers, so correctness depends on never
/// writing a second request before the first response is consumed.
pub struct RootBroker {
    spawner: HelperSpawner,
    worker: Mutex<Option<HelperHandle>>,
}

impl RootBroker {
    pub fn new(spawner: HelperSpawner) -> Self {
        Self {
            spawner,
            worker: Mutex::new(None),
        }
    }

    /// Starts the helper eagerly so the authentication prompt is front-loaded
    /// rather than surprising the user mid-action. Idempotent.
    pub async fn warm_up(&self) -> Result<(), BrokerError> {
        let mut slot = self.worker.lock().await;
        self.ensure_worker(&mut slot).await.map(|_| ())
    }

    /// Submits one argv to the elevated worker and blocks for its single
    /// response. On success returns the command's trimmed stdout; every
    /// failure mode is a [`BrokerError`] with displayable text.
    pub async fn run_root(&self, argv: &[String]) -> Result<String, BrokerError> {
        let request = HelperRequest::new(argv.to_vec());
        let line =
            serde_json::to_string(&request).map_err(|err| BrokerError::Ipc(err.to_string()))?;

        let mut slot = self.worker.lock().await;
        let (handle, freshly_spawned) = self.ensure_worker(&mut slot).await?;
        let exchanged = Self::exchange(handle, &line).await;

        match exchanged {
            Ok(response) => interpret(response),
            Err(failure) => {
                // Drop the handle so the next privileged call re-probes and
                // spawns a fresh worker; the failed request itself is never
                // resubmitted because the dead worker may already have run it.
                *slot = None;
                Err(Self::map_exchange_failure(failure, freshly_spawned))
            }
        }
    }

    async fn ensure_worker<'a>(
        &self,
        slot: &'a mut Option<HelperHandle>,
    ) -> Result<(&'a mut HelperHandle, bool), BrokerError> {
        let alive = slot.as_mut().is_some_and(HelperHandle::is_alive);
        if !alive {
            let handle = self.spawn_with_retry().await?;
            return Ok((slot.insert(handle), true));
        }
        match slot.as_mut() {
            Some(handle) => Ok((handle, false)),
            None => Err(BrokerError::HelperExited),
        }
    }

    async fn spawn_with_retry(&self) -> Result<HelperHandle, BrokerError> {
        let mut last_error = None;
        for attempt in 1..=MAX_SPAWN_ATTEMPTS {
            match self.spawner.spawn() {
                Ok(handle) => return Ok(handle),
                Err(err) => {
                    warn!("root helper spawn attempt {attempt} failed: {err}");
                    last_error = Some(err);
                }
            }
            if attempt < MAX_SPAWN_ATTEMPTS {
                tokio::time::sleep(SPAWN_RETRY_DELAY).await;
            }
        }
        Err(BrokerError::StartHelper(last_error.unwrap_or_else(|| {
            std::io::Error::other("helper spawn failed")
        })))
    }

    async fn exchange(
        handle: &mut HelperHandle,
        line: &str,
    ) -> Result<HelperResponse, ExchangeFailure> {
        trace!("request to root helper: {line}");
        handle
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(ExchangeFailure::Transport)?;
        handle
            .stdin
            .write_all(b"\n")
            .await
            .map_err(ExchangeFailure::Transport)?;
        handle
            .stdin
            .flush()
            .await
            .map_err(ExchangeFailure::Transport)?;

        let mut reply = String::new();
        let read = handle
            .stdout
            .read_line(&mut reply)
            .await
            .map_err(ExchangeFailure::Transport)?;
        if read == 0 {
            return Err(ExchangeFailure::Eof);
        }
        trace!("reply from root helper: {}", reply.trim_end());
        serde_json::from_str(&reply).map_err(ExchangeFailure::MalformedResponse)
    }

    fn map_exchange_failure(failure: ExchangeFailure, freshly_spawned: bool) -> BrokerError {
        match failure {
            // A fresh worker whose pipes fail immediately means the elevation
            // itself did not come up (e.g. the user declined the prompt), so
            // it surfaces the same way as a failed spawn.
            ExchangeFailure::Eof if freshly_spawned => BrokerError::StartHelper(
                std::io::Error::other("helper closed its pipes during the first exchange"),
            ),
            ExchangeFailure::Transport(err) if freshly_spawned => BrokerError::StartHelper(err),
            ExchangeFailure::Eof => BrokerError::HelperExited,
            ExchangeFailure::Transport(err) => BrokerError::Ipc(err.to_string()),
            ExchangeFailure::MalformedResponse(err) => BrokerError::Ipc(err.to_string()),
        }
    }
}

fn interpret(response: HelperResponse) -> Result<String, BrokerError> {
    match response {
        HelperResponse::Error { error } => Err(BrokerError::Helper(error)),
        HelperResponse::Exec {
            stdout,
            stderr,
            returncode,
        } => {
            if returncode == 0 {
                Ok(stdout.trim().to_string())
            } else {
                Err(BrokerError::CommandFailed {
                    exit_code: returncode,
                    stderr: stderr.trim().to_string(),
                })
            }
        }
    }
}

/// Runs one argv locally with no elevation and no worker. Used for the
/// read-only liveness query that is polled every few seconds: routing it
/// through the broker would serialize every poll behind the single worker.
pub async fn run_unprivileged(argv: &[String]) -> Result<String, BrokerError> {
    let output = exec::execute(argv).await?;
    if output.exit_code != 0 {
        return Err(BrokerError::CommandFailed {
            exit_code: output.exit_code,
            stderr: output.stderr,
        });
    }
    Ok(output.stdout)
}
