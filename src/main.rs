//! salur - DHCPv4 front-end brokering requests as JSON to backend workers.

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use salur::client;
use salur::codec::registry;
use salur::config::{self, Settings};
use salur::pidfile;
use salur::relay::RelayServer;

#[derive(Parser)]
#[command(name = "salur", version)]
#[command(about = "DHCPv4 front-end brokering requests as JSON to backend workers")]
struct Cli {
    /// Use specified server UDP port
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Use specified server address
    #[arg(short, long, default_value = config::DEFAULT_ADDRESS)]
    address: IpAddr,

    /// Use specified network interface
    #[arg(short, long)]
    interface: Option<String>,

    /// Requests retry count in client mode (1-5)
    #[arg(short, long, default_value_t = config::DEFAULT_RETRIES)]
    retries: u32,

    /// Add specified DHCP attributes (a JSON object) to the client-mode request
    #[arg(short = 'R', long)]
    request: Option<String>,

    /// Run the specified backend command in server mode (default: client mode)
    #[arg(short, long)]
    backend: Option<String>,

    /// Run backend workers under these credentials (user[:group], root only)
    #[arg(short, long)]
    credentials: Option<String>,

    /// Backend workers count in server mode (1-32)
    #[arg(short = 'n', long, default_value_t = config::DEFAULT_WORKERS)]
    workers: usize,

    /// Syslog-style logging facility recorded in log output
    #[arg(short, long)]
    facility: Option<String>,

    /// Store the server PID at this path
    #[arg(short = 'z', long)]
    pidfile: Option<PathBuf>,

    /// List all keys usable in the worker JSON protocol and exit
    #[arg(short, long)]
    listkeys: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.listkeys {
        if let Err(e) = registry::list_keys(&mut std::io::stdout()) {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer)
        .init();
    if let Some(facility) = &cli.facility {
        tracing::debug!("logging facility {}", facility);
    }

    let settings = match build_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{:#} - exiting", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        "starting salur v{} in {} mode",
        env!("CARGO_PKG_VERSION"),
        if settings.server_mode() { "server" } else { "client" }
    );

    if let Some(path) = &settings.pidfile {
        if let Err(e) = pidfile::acquire(path) {
            tracing::error!("{} - exiting", e);
            return ExitCode::FAILURE;
        }
    }

    let outcome = if settings.server_mode() {
        match RelayServer::bind(&settings) {
            Ok(server) => server.run().await,
            Err(e) => Err(e.into()),
        }
    } else {
        client::run(&settings).await
    };

    if let Some(path) = &settings.pidfile {
        pidfile::release(path);
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#} - exiting", e);
            ExitCode::FAILURE
        }
    }
}

fn build_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let backend = cli
        .backend
        .as_deref()
        .map(config::split_command)
        .transpose()?;
    let server_mode = backend.is_some();
    if !server_mode && cli.interface.is_none() {
        anyhow::bail!("you need to specify an interface in client mode");
    }

    let credentials = match cli.credentials.as_deref() {
        Some(spec) => {
            let resolved = config::resolve_credentials(spec)?;
            if nix::unistd::geteuid().is_root() {
                Some(resolved)
            } else {
                tracing::warn!("not running as root, ignoring --credentials");
                None
            }
        }
        None => None,
    };

    let extra_request = cli
        .request
        .as_deref()
        .map(config::parse_request_extra)
        .transpose()?;

    // the pidfile is only defaulted in server mode
    let pidfile = match (&cli.pidfile, server_mode) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(config::DEFAULT_PIDFILE)),
        (None, false) => None,
    };

    Ok(Settings {
        address: cli.address,
        port: cli.port,
        interface: cli.interface.clone(),
        backend,
        credentials,
        workers: config::clamp_workers(cli.workers),
        retries: config::clamp_retries(cli.retries),
        extra_request,
        pidfile,
    })
}
