use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use session_gateway::admin::handlers::{AdmissionSummary, SessionView, SystemStatus};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the session gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "GATEWAY_ADMIN_URL", default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_KEY")]
    key: String,

    /// Print raw JSON instead of a table.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status and configured routes
    Status,
    /// List session exclusivity locks
    Sessions,
    /// Show in-flight requests per client
    Admission,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;

    let path = match cli.command {
        Commands::Status => "status",
        Commands::Sessions => "sessions",
        Commands::Admission => "admission",
    };
    let res = client
        .get(format!("{}/admin/{}", cli.url.trim_end_matches('/'), path))
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let body: serde_json::Value = res.json().await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match cli.command {
        Commands::Status => print_status(serde_json::from_value(body)?),
        Commands::Sessions => print_sessions(serde_json::from_value(body)?),
        Commands::Admission => print_admission(serde_json::from_value(body)?),
    }
    Ok(())
}

fn print_status(status: SystemStatus) {
    println!(
        "{} v{} up {}s | {} active sessions | {} tracked clients",
        status.status, status.version, status.uptime_secs, status.active_sessions, status.tracked_clients
    );
    println!("{:<20} {:<36} {:<32} {:>8} {:>5} {:>7}", "ROUTE", "PREFIX", "TARGET", "TIMEOUT", "AUTH", "SESSION");
    for r in status.routes {
        println!(
            "{:<20} {:<36} {:<32} {:>6}ms {:>5} {:>7}",
            r.name, r.prefix, r.target, r.timeout_ms, r.requires_auth, r.session_guarded
        );
    }
}

fn print_sessions(sessions: Vec<SessionView>) {
    if sessions.is_empty() {
        println!("No session locks");
        return;
    }
    println!("{:<24} {:<24} {:<16} {:>10} {:>8}", "RESOURCE", "OWNER", "USER", "PROCESSING", "IDLE");
    for s in sessions {
        println!(
            "{:<24} {:<24} {:<16} {:>10} {:>7}s",
            s.resource_id,
            s.owner,
            s.user_id.as_deref().unwrap_or("-"),
            s.is_processing,
            s.idle_secs
        );
    }
}

fn print_admission(summary: AdmissionSummary) {
    println!("Limit: {} in-flight requests per client", summary.max_concurrent);
    if summary.clients.is_empty() {
        println!("No requests in flight");
        return;
    }
    println!("{:<40} {:>9}", "CLIENT", "IN-FLIGHT");
    for c in summary.clients {
        println!("{:<40} {:>9}", c.client, c.in_flight);
    }
}
