use std::ffi::OsString;
use std::process::Stdio;

use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tracing::debug;

/// Marker argument that flips this same binary into the elevated worker role.
pub const ROOT_HELPER_ARG: &str = "--root-helper";

/// Recipe for launching the elevated worker process.
///
/// The production spawner goes through `pkexec`, the host's trusted
/// authentication-and-elevation front end, re-invoking the current executable
/// with [`ROOT_HELPER_ARG`]. Tests substitute an arbitrary program that speaks
/// the same wire protocol without any elevation.
#[derive(Debug, Clone)]
pub struct HelperSpawner {
    program: OsString,
    args: Vec<OsString>,
}

impl HelperSpawner {
    pub fn new(program: impl Into<OsString>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The real thing: `pkexec <current_exe> --root-helper`. This is the only
    /// point in the system where privilege is actually requested.
    pub fn pkexec() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        Ok(Self::new(
            "pkexec",
            vec![exe.into_os_string(), ROOT_HELPER_ARG.into()],
        ))
    }

    pub(crate) fn spawn(&self) -> std::io::Result<HelperHandle> {
        debug!("spawning root helper: {:?} {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // The worker's stderr is diagnostic only, not part of the
            // protocol.
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture helper stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture helper stdout"))?;

        Ok(HelperHandle {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

/// Ownership record for the one spawned worker: the child itself plus the
/// write and read ends of its pipes. Held exclusively by [`RootBroker`]
/// behind its request mutex.
///
/// [`RootBroker`]: crate::RootBroker
pub(crate) struct HelperHandle {
    child: Child,
    pub(crate) stdin: ChildStdin,
    pub(crate) stdout: BufReader<ChildStdout>,
}

impl HelperHandle {
    /// Probes whether the worker is still running. `try_wait` also reaps the
    /// child if it has already exited, so a dead handle is detected (and can
    /// be replaced) on the next privileged call.
    pub(crate) fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}
