use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vqs::Config;

#[derive(Parser)]
#[command(name = "vqs", version, about = "Vector query service")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP service
    Serve {
        /// Address to bind to
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Directory for vector files, index blobs, and the database
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log to stderr; --verbose forces debug, otherwise RUST_LOG or info
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            port,
            data_dir,
        } => {
            let cwd = std::env::current_dir()?;
            let mut config = Config::load(&cwd);
            // CLI flags override config files and environment
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.database_path = data_dir.join("vqs.db");
                config.data_dir = data_dir;
            }
            vqs::api::serve(&config)
        }
    }
}
