use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use nestegg::api::{self, ServerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Deterministic retirement affordability projections"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON projection API
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        bind: IpAddr,
        #[arg(
            long,
            default_value_t = 2_000,
            help = "Per-request projection timeout in milliseconds"
        )]
        timeout_ms: u64,
    },
    /// Run one projection from a request file and print the result JSON
    Project {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, help = "Anchor year; defaults to startYear in the file, then the current year")]
        start_year: Option<i32>,
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Serve {
            port,
            bind,
            timeout_ms,
        } => {
            let config = ServerConfig {
                bind,
                port,
                request_timeout: Duration::from_millis(timeout_ms),
            };
            api::run_http_server(config)
                .await
                .map_err(|e| format!("Server error: {e}"))
        }
        Command::Project {
            input,
            start_year,
            pretty,
        } => project_file(&input, start_year, pretty),
    };

    if let Err(msg) = outcome {
        eprintln!("{msg}");
        process::exit(1);
    }
}

fn project_file(input: &Path, start_year: Option<i32>, pretty: bool) -> Result<(), String> {
    let json = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read {}: {e}", input.display()))?;
    let rendered =
        api::render_projection_json(&json, start_year, pretty).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}
