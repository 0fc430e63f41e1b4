use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the origin relay", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    /// Admin API key.
    #[arg(short, long, default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay status
    Status,
    /// Show the effective forwarding settings
    Config,
    /// Liveness of the relay process
    Health,
    /// Poll a URL until it answers 2xx (e.g. after a deploy)
    Probe {
        /// URL to probe (public or upstream origin)
        target: String,
        /// Number of attempts before giving up
        #[arg(long, default_value_t = 10)]
        attempts: u32,
        /// Seconds between attempts
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
        /// Per-attempt timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;

    match cli.command {
        Commands::Status => print_json(client.get(format!("{}/admin/status", cli.url)).send().await?).await,
        Commands::Config => print_json(client.get(format!("{}/admin/config", cli.url)).send().await?).await,
        Commands::Health => {
            let res = client.get(format!("{}/admin/health", cli.url)).send().await?;
            let status = res.status();
            println!("{} {}", status, res.text().await?);
            Ok(exit_code(status.is_success()))
        }
        Commands::Probe {
            target,
            attempts,
            interval_secs,
            timeout_secs,
        } => probe(&target, attempts, Duration::from_secs(interval_secs), Duration::from_secs(timeout_secs)).await,
    }
}

async fn print_json(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(ExitCode::FAILURE);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(ExitCode::SUCCESS)
}

async fn probe(
    target: &str,
    attempts: u32,
    interval: Duration,
    timeout: Duration,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Probes go to arbitrary origins; no admin credentials.
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    for attempt in 1..=attempts {
        let start = Instant::now();
        match client.get(target).send().await {
            Ok(res) if res.status().is_success() => {
                println!(
                    "[{}/{}] {} {} in {} ms: healthy",
                    attempt,
                    attempts,
                    target,
                    res.status(),
                    start.elapsed().as_millis()
                );
                return Ok(ExitCode::SUCCESS);
            }
            Ok(res) => println!(
                "[{}/{}] {} {} in {} ms",
                attempt,
                attempts,
                target,
                res.status(),
                start.elapsed().as_millis()
            ),
            Err(e) => println!("[{}/{}] {} failed: {}", attempt, attempts, target, e),
        }

        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    eprintln!("{} never answered 2xx after {} attempts", target, attempts);
    Ok(ExitCode::FAILURE)
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
