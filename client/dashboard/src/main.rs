//! Siaduan Dashboard - terminal entry point
//!
//! Reads commands from stdin, prints panels to stdout and logs to stderr
//! (`RUST_LOG` controls verbosity, default `info`).

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use siaduan_chain_client::http::HttpTransport;
use siaduan_chain_client::RpcWallet;
use siaduan_dashboard::{command::HELP, Dashboard, DashboardConfig, Reply};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match DashboardConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(code = e.code(), error = %e, "invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        network = %config.chain.name,
        chain_id = config.chain.chain_id,
        rpc = %config.chain.rpc_url,
        approval = ?config.approval,
        "starting dashboard"
    );

    let transport = Arc::new(HttpTransport::new(config.chain.rpc_url.clone())?);
    let wallet = RpcWallet::new(transport, config.contracts, config.chain.chain_id);
    let dashboard = Dashboard::new(wallet, config);

    println!("{HELP}");
    if let Some(Reply::Text(text)) = dashboard.handle_line("connect").await {
        println!("{text}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match dashboard.handle_line(&line).await {
            Some(Reply::Text(text)) => println!("{text}"),
            Some(Reply::Quit) => break,
            None => {}
        }
    }

    dashboard.store().disconnect();
    Ok(())
}
