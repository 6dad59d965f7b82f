//! Tunnel-management domain operations.
//!
//! Every operation here is a pure composition of a name-validation guard and
//! an argument vector submitted through the privileged broker – with one
//! exception, the liveness query, which deliberately runs unprivileged.

mod manager;
mod tunnel_name;

pub use manager::DEFAULT_CONFIG_DIR;
pub use manager::TunnelManager;
pub use tunnel_name::TunnelName;

use thiserror::Error;
use wgctl_broker::BrokerError;

#[derive(Debug, Error)]
pub enum TunnelError {
    /// The supplied name fails the `[A-Za-z0-9_.-]+` character class. This is
    /// the system's only input-sanitization boundary: it keeps path traversal
    /// and shell metacharacters out of every privileged argv.
    #[error("invalid tunnel name: '{0}'")]
    InvalidName(String),
    #[error("config already exists: {0}")]
    AlreadyExists(String),
    #[error("config not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}
