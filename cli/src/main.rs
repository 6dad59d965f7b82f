use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use tracing_subscriber::EnvFilter;
use wgctl_broker::HelperSpawner;
use wgctl_broker::ROOT_HELPER_ARG;
use wgctl_broker::RootBroker;
use wgctl_core::TunnelManager;
use wgctl_core::TunnelName;

/// Manage WireGuard tunnel configurations and their up/down state.
///
/// Privileged operations go through a single long-lived root helper started
/// via pkexec; the same binary invoked with `--root-helper` becomes that
/// helper.
#[derive(Debug, Parser)]
#[clap(name = "wgctl", version, bin_name = "wgctl")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List installed tunnel configurations.
    List,
    /// Show the interfaces that are currently up.
    Active,
    /// Bring a tunnel up.
    Up { name: TunnelName },
    /// Take a tunnel down.
    Down { name: TunnelName },
    /// Install a configuration file into the configuration directory.
    Install { path: PathBuf },
    /// Rename an installed configuration.
    Rename { old: TunnelName, new: TunnelName },
    /// Show diagnostics for a tunnel (default: the first active one).
    Show { name: Option<TunnelName> },
    /// Open an installed configuration in the desktop editor.
    Edit { name: TunnelName },
}

impl Command {
    fn needs_elevation(&self) -> bool {
        !matches!(self, Command::Active)
    }
}

fn main() -> anyhow::Result<()> {
    // Role dispatch comes first: when launched by pkexec with the marker
    // argument, this process is the elevated worker and nothing else.
    if std::env::args_os().nth(1).as_deref() == Some(std::ffi::OsStr::new(ROOT_HELPER_ARG)) {
        wgctl_root_helper::run_main();
    }

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let broker = Arc::new(RootBroker::new(HelperSpawner::pkexec()?));
    if cli.command.needs_elevation() {
        // Front-load the authentication prompt before doing anything else.
        broker.warm_up().await?;
    }
    let manager = TunnelManager::new(broker);

    match cli.command {
        Command::List => {
            for name in manager.list_configs().await? {
                println!("{name}");
            }
        }
        Command::Active => {
            for interface in manager.active_interfaces().await {
                println!("{interface}");
            }
        }
        Command::Up { name } => {
            manager.connect(&name).await?;
            println!("Connected to {name}.");
        }
        Command::Down { name } => {
            manager.disconnect(&name).await?;
            println!("Disconnected from {name}.");
        }
        Command::Install { path } => {
            let name = manager.install_config(&path).await?;
            println!("Installed {name}.");
        }
        Command::Rename { old, new } => {
            manager.rename(&old, &new).await?;
            println!("Renamed {old} to {new}.");
        }
        Command::Show { name } => {
            let target = match name {
                Some(name) => name,
                None => match manager.active_interfaces().await.first() {
                    Some(first) => first.parse()?,
                    None => anyhow::bail!("no active tunnel"),
                },
            };
            println!("{}", manager.tunnel_info(&target).await);
        }
        Command::Edit { name } => {
            manager.edit_config(&name).await?;
        }
    }
    Ok(())
}
