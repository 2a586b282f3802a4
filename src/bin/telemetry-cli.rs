use clap::{Parser, Subcommand};
use serde_json::Value;
use url::Url;

#[derive(Parser)]
#[command(name = "telemetry-cli")]
#[command(about = "Inspect the telemetry endpoints of a running service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: Url,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Prometheus exposition
    Metrics,
    /// Run every health check
    Health,
    /// Run a single health check
    Check { name: String },
    /// List the spans of a trace
    Trace { trace_id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Metrics => {
            let res = client.get(cli.url.join("metrics")?).send().await?;
            print_text(res).await?;
        }
        Commands::Health => {
            let res = client.get(cli.url.join("health")?).send().await?;
            print_json(res).await?;
        }
        Commands::Check { name } => {
            let mut url = cli.url.join("health/")?;
            url.path_segments_mut()
                .map_err(|_| "base URL cannot have a path")?
                .pop_if_empty()
                .push(&name);
            let res = client.get(url).send().await?;
            print_json(res).await?;
        }
        Commands::Trace { trace_id } => {
            let mut url = cli.url.join("traces/")?;
            url.path_segments_mut()
                .map_err(|_| "base URL cannot have a path")?
                .pop_if_empty()
                .push(&trace_id);
            let res = client.get(url).send().await?;
            print_json(res).await?;
        }
    }

    Ok(())
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }
    print!("{}", text);
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
