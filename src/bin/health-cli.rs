use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "health-cli")]
#[command(about = "Query the probe endpoints of a health monitor", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Request timeout in seconds.
    #[arg(short, long, default_value_t = 20)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full health status with every dependency check
    Health,
    /// Readiness level (fully_ready, partially_ready, not_ready)
    Ready,
    /// Liveness of the monitored process
    Live,
    /// Circuit breaker state per dependency
    Breakers,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Health => "/health",
            Commands::Ready => "/health/ready",
            Commands::Live => "/health/live",
            Commands::Breakers => "/health/breakers",
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(cli.timeout))
        .build()?;

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.get(&url).send().await?;
    let status = res.status();

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);

    if status == StatusCode::SERVICE_UNAVAILABLE {
        eprintln!("{} returned {}", url, status);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
