mod directory;
mod server;
mod stream;
mod upstream;
mod worker;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use directory::Directory;
use server::AppState;

#[derive(Parser, Debug)]
#[command(name = "anarcast")]
#[command(about = "Icecast to HLS repackaging server", long_about = None)]
struct Args {
    /// Redirect URL for non-existent pages
    #[arg(short = 'r', long = "redirect")]
    redirect: Option<String>,

    /// Minimum number of active streams required for the server to be
    /// deemed healthy
    #[arg(short = 'm', long = "minimum", default_value_t = 0)]
    minimum: usize,

    /// Listen address (e.g. :8888)
    addr: String,

    /// Origin base URL, no trailing slash (e.g. http://origin.example.com)
    base: String,

    /// Mountpoint names to pull from the origin
    #[arg(required = true)]
    mounts: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .compact()
        .init();

    let args = Args::parse();
    info!(
        addr = %args.addr,
        base = %args.base,
        mounts = ?args.mounts,
        "anarcast starting"
    );

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let shutdown = CancellationToken::new();
    let directory = Directory::new(args.base, args.mounts, client);
    directory.start(shutdown.clone());

    let state = AppState {
        directory,
        redirect: args.redirect,
        minimum: args.minimum,
    };

    tokio::select! {
        result = server::serve(&args.addr, state, shutdown.clone()) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    }

    Ok(())
}
