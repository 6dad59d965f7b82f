//! Privileged command-execution broker.
//!
//! The unprivileged process obtains elevated execution rights exactly once by
//! spawning a single long-lived root helper through the host's trusted
//! elevation front end (`pkexec`). Every privileged operation is then funneled
//! through [`RootBroker`], which speaks the newline-delimited JSON protocol
//! from `wgctl-protocol` over the helper's stdin/stdout.

mod client;
mod exec;
mod launcher;

pub use client::BrokerError;
pub use client::RootBroker;
pub use client::run_unprivileged;
pub use exec::ExecError;
pub use exec::ExecOutput;
pub use exec::execute;
pub use launcher::HelperSpawner;
pub use launcher::ROOT_HELPER_ARG;
