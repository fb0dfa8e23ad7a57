use buildbox_cli::config::Config;
use buildbox_cli::{init_tracing, run_server};
use clap::Parser;
use colored::*;
use std::net::IpAddr;
use std::process;

#[derive(Parser)]
#[command(name = "buildbox")]
#[command(about = "Buildbox - sandboxed Angular, React and Vue component builds")]
#[command(version)]
struct Cli {
    /// Address to bind (overrides BUILDBOX_HOST)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on (overrides BUILDBOX_PORT)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            process::exit(1);
        }
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    if let Err(e) = run_server(config).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
