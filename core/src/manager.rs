use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use wgctl_broker::BrokerError;
use wgctl_broker::RootBroker;
use wgctl_broker::run_unprivileged;

use crate::TunnelError;
use crate::TunnelName;

/// Fixed configuration directory: one `<name>.conf` per tunnel.
pub const DEFAULT_CONFIG_DIR: &str = "/etc/wireguard";

/// Session environment forwarded to the privileged editor launch so the
/// editor appears on the caller's display.
const EDITOR_SESSION_ENV: [&str; 3] = ["DISPLAY", "XAUTHORITY", "DBUS_SESSION_BUS_ADDRESS"];

pub struct TunnelManager {
    broker: Arc<RootBroker>,
    config_dir: PathBuf,
}

impl TunnelManager {
    pub fn new(broker: Arc<RootBroker>) -> Self {
        Self::with_config_dir(broker, PathBuf::from(DEFAULT_CONFIG_DIR))
    }

    /// The configuration directory is injectable so tests can point the
    /// manager at a scratch directory.
    pub fn with_config_dir(broker: Arc<RootBroker>, config_dir: PathBuf) -> Self {
        Self { broker, config_dir }
    }

    /// Lists installed tunnel configurations. Entries whose stem fails the
    /// name pattern are dropped – defense in depth even though the directory
    /// itself is trusted.
    pub async fn list_configs(&self) -> Result<Vec<TunnelName>, TunnelError> {
        let out = self
            .broker
            .run_root(&argv(&[
                "find",
                &self.config_dir.to_string_lossy(),
                "-maxdepth",
                "1",
                "-type",
                "f",
                "-name",
                "*.conf",
                "-printf",
                "%f\n",
            ]))
            .await?;

        Ok(out
            .lines()
            .filter_map(|file| file.strip_suffix(".conf"))
            .filter_map(|stem| TunnelName::new(stem).ok())
            .collect())
    }

    /// Interfaces that are currently up, per the tunnel manager itself.
    ///
    /// Deliberately unprivileged: this is polled every few seconds and is
    /// read-only, so routing it through the broker would serialize every poll
    /// behind the single worker and needlessly re-authenticate. A failed
    /// query reads as "nothing active".
    pub async fn active_interfaces(&self) -> Vec<String> {
        match run_unprivileged(&argv(&["wg", "show", "interfaces"])).await {
            Ok(out) => out.split_whitespace().map(str::to_string).collect(),
            Err(err) => {
                debug!("active interface query failed: {err}");
                Vec::new()
            }
        }
    }

    pub async fn connect(&self, name: &TunnelName) -> Result<(), TunnelError> {
        self.broker
            .run_root(&argv(&["wg-quick", "up", name.as_str()]))
            .await?;
        Ok(())
    }

    pub async fn disconnect(&self, name: &TunnelName) -> Result<(), TunnelError> {
        self.broker
            .run_root(&argv(&["wg-quick", "down", name.as_str()]))
            .await?;
        Ok(())
    }

    /// Installs a config file into the configuration directory with owner-only
    /// permissions. Refuses to overwrite an existing config.
    pub async fn install_config(&self, source: &Path) -> Result<TunnelName, TunnelError> {
        let file_name = source
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| TunnelError::InvalidName(source.display().to_string()))?;
        let stem = source
            .file_stem()
            .and_then(OsStr::to_str)
            .ok_or_else(|| TunnelError::InvalidName(source.display().to_string()))?;
        let name = TunnelName::new(stem)?;

        let dest = self.config_dir.join(file_name);
        let dest = dest.to_string_lossy();
        match self.broker.run_root(&argv(&["test", "-e", &dest])).await {
            // `test -e` succeeding means the destination is already there.
            Ok(_) => return Err(TunnelError::AlreadyExists(dest.into_owned())),
            Err(BrokerError::CommandFailed { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        self.broker
            .run_root(&argv(&[
                "install",
                "-m",
                "600",
                &source.to_string_lossy(),
                &dest,
            ]))
            .await?;
        Ok(name)
    }

    /// Renames an installed config. Both names are already validated, so the
    /// privileged move only ever sees paths inside the configuration
    /// directory.
    pub async fn rename(&self, old: &TunnelName, new: &TunnelName) -> Result<(), TunnelError> {
        let old_path = self.config_path(old);
        let new_path = self.config_path(new);
        self.broker
            .run_root(&argv(&[
                "mv",
                &old_path.to_string_lossy(),
                &new_path.to_string_lossy(),
            ]))
            .await?;
        Ok(())
    }

    /// Raw diagnostic text for one interface; error text is substituted when
    /// the query fails so the caller always has something to display.
    pub async fn tunnel_info(&self, name: &TunnelName) -> String {
        match self
            .broker
            .run_root(&argv(&["wg", "show", name.as_str()]))
            .await
        {
            Ok(out) if !out.is_empty() => out,
            Ok(_) => "No information available.".to_string(),
            Err(err) => err.to_string(),
        }
    }

    /// Opens an installed config in the user's editor. The file lives in a
    /// root-owned directory, so the open goes through the broker with the
    /// caller's session environment forwarded.
    pub async fn edit_config(&self, name: &TunnelName) -> Result<(), TunnelError> {
        let conf = self.config_path(name);
        let conf = conf.to_string_lossy();
        match self.broker.run_root(&argv(&["test", "-e", &conf])).await {
            Ok(_) => {}
            Err(BrokerError::CommandFailed { .. }) => {
                return Err(TunnelError::NotFound(conf.into_owned()));
            }
            Err(err) => return Err(err.into()),
        }

        let mut open = vec!["env".to_string()];
        for key in EDITOR_SESSION_ENV {
            let value = std::env::var(key).unwrap_or_default();
            open.push(format!("{key}={value}"));
        }
        open.push("xdg-open".to_string());
        open.push(conf.into_owned());
        self.broker.run_root(&open).await?;
        Ok(())
    }

    fn config_path(&self, name: &TunnelName) -> PathBuf {
        self.config_dir.join(format!("{name}.conf"))
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}
