//! Wire types for the root-helper protocol.
//!
//! The unprivileged client and the elevated worker exchange newline-delimited
//! JSON over the worker's stdin/stdout. Each request is one JSON array of
//! strings (a literal argv, never interpreted by a shell); each response is one
//! JSON object, either the captured outcome of running that argv or an `error`
//! object when the worker could not run the request at all. The channel is
//! strictly FIFO with exactly one response per request – there are no request
//! identifiers, so the client must never pipeline.

use serde::Deserialize;
use serde::Serialize;

/// Error text the worker replies with when a request line does not decode as a
/// flat list of strings.
pub const INVALID_REQUEST_FORMAT: &str = "Invalid request format";

/// One command for the elevated worker to run: a non-empty argv, executed as a
/// literal process image plus arguments.
///
/// Serializes as a bare JSON array of strings, e.g.
/// `["wg-quick","up","office"]`. Deserialization fails for anything that is
/// not an array of strings, which is exactly the shape check the worker loop
/// relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HelperRequest(Vec<String>);

impl HelperRequest {
    pub fn new(argv: Vec<String>) -> Self {
        Self(argv)
    }

    pub fn argv(&self) -> &[String] {
        &self.0
    }

    pub fn into_argv(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for HelperRequest {
    fn from(argv: Vec<String>) -> Self {
        Self(argv)
    }
}

/// One reply from the elevated worker.
///
/// The two forms are mutually exclusive: `Exec` reports that the requested
/// command ran (regardless of its exit code – interpreting a non-zero
/// `returncode` is the client's job), while `Error` reports that the worker
/// itself could not run the request (malformed line, spawn failure, decoding
/// fault).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HelperResponse {
    Exec {
        stdout: String,
        stderr: String,
        returncode: i32,
    },
    Error {
        error: String,
    },
}

impl HelperResponse {
    pub fn error(message: impl Into<String>) -> Self {
        HelperResponse::Error {
            error: message.into(),
        }
    }

    pub fn invalid_request() -> Self {
        Self::error(INVALID_REQUEST_FORMAT)
    }
}
