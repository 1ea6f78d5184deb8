use std::path::PathBuf;

use clap::Parser;
use tetris_battle::{MatchConfig, RoomRegistry, assets, connection};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Two-player battle server: websocket rooms plus an optional static file
/// server for the browser client.
#[derive(Parser, Debug, Clone)]
struct Opts {
    /// Address for websocket connections
    #[arg(long, default_value = "127.0.0.1:3001")]
    listen: String,
    /// Optional JSON file overriding match timing and rules
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory with the browser client; not served when omitted
    #[arg(long)]
    web_root: Option<PathBuf>,
    /// Address for the static file server
    #[arg(long, default_value = "127.0.0.1:8080")]
    web_listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = Opts::parse();
    let config = match opts.config.as_deref() {
        Some(path) => MatchConfig::from_file(path)?,
        None => MatchConfig::default(),
    };
    info!(?config, "match config");

    if let Some(root) = opts.web_root.clone() {
        let addr = opts.web_listen.clone();
        std::thread::spawn(move || {
            if let Err(e) = assets::serve_static(&addr, root) {
                error!("static server stopped: {e:?}");
            }
        });
    }

    let listener = TcpListener::bind(&opts.listen).await?;
    info!("battle server listening on ws://{}", opts.listen);
    connection::serve(listener, RoomRegistry::new(config)).await
}
