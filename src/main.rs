use anyhow::{bail, Context, Result};
use config_manager::SystemConfig;
use flow_core::{format_date, format_number, run_analysis, to_csv, AnalysisRequestBody};
use helius_client::HeliusClient;
use std::path::PathBuf;
use tracing::{info, warn};

const USAGE: &str = "usage: token_flow <request.json> [--csv <output.csv>]";

struct CliArgs {
    request_path: PathBuf,
    csv_path: Option<PathBuf>,
}

fn parse_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut request_path = None;
    let mut csv_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" => {
                let path = args.next().context(USAGE)?;
                csv_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => bail!(USAGE),
            _ if request_path.is_none() => request_path = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument '{}'\n{}", arg, USAGE),
        }
    }

    Ok(CliArgs {
        request_path: request_path.context(USAGE)?,
        csv_path,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    let system_config = SystemConfig::load()?;

    // Initialize logging
    let default_filter = if system_config.system.debug_mode {
        "debug"
    } else {
        "info,token_flow=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let raw = std::fs::read_to_string(&args.request_path)
        .with_context(|| format!("reading {}", args.request_path.display()))?;
    let body: AnalysisRequestBody = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.request_path.display()))?;
    let request = body.into_request(system_config.analysis.default_max_wallets)?;

    let client = HeliusClient::new(system_config.helius.clone())?;

    if let Some(metadata) = client.fetch_token_metadata(&request.token_address).await {
        info!(
            "🪙 Token: {} ({})",
            metadata.name.as_deref().unwrap_or("unknown"),
            metadata.symbol.as_deref().unwrap_or("?")
        );
    }

    let rows = run_analysis(&client, &request, client.page_size()).await?;

    info!("📊 {} rows", rows.len());
    for row in &rows {
        info!(
            "   {} {:<4} {:>16} {}",
            row.wallet,
            row.trade_type.as_str(),
            format_number(row.amount),
            format_date(&row.date)
        );
    }

    match args.csv_path {
        Some(path) => {
            if rows.is_empty() {
                warn!("No rows to export, writing an empty file");
            }
            std::fs::write(&path, to_csv(&rows)?)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("CSV written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&rows)?),
    }

    Ok(())
}
