//! deskstat: desktop status publisher and status bar widgets.

use clap::Parser;
use deskstat_core::Theme;
use deskstat_runtime::cli::{Cli, Command};
use deskstat_runtime::publish::{PublishConfig, run_publisher};
use deskstat_runtime::{client, widget};

fn init_tracing(verbose: bool, debug: bool) {
    let default = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = std::env::var("DESKSTAT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let socket_path = cli.socket_path();
    let theme = Theme::default();

    match cli.command {
        Command::Publish(opts) => {
            tracing::info!("deskstat publisher starting");
            let config = PublishConfig::from_opts(socket_path, &opts);
            run_publisher(config, theme).await?;
        }
        Command::Widget(opts) => {
            widget::run_widget(&socket_path, &opts.tags, opts.options(), opts.once, &theme).await?;
        }
        Command::Props => {
            client::cmd_props(&socket_path).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("deskstat: {e:#}");
        std::process::exit(1);
    }
}
