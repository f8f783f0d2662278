use std::path::PathBuf;

use tracing::{info, warn};

use campus_scout::core::config::load_scout_config;
use campus_scout::{tabular, PipelineState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting the scraping process");

    let config = load_scout_config();
    let input_path = PathBuf::from(config.resolve_input_path());
    let output_path = PathBuf::from(config.resolve_output_path());
    let start_row = config.resolve_start_row();

    let organizations = tabular::read_organizations(&input_path, start_row)?;
    if organizations.is_empty() {
        warn!("No organizations to process in {}", input_path.display());
        return Ok(());
    }
    if start_row > 0 {
        info!("Resuming from row {}", start_row + 1);
    }
    info!("Organizations to process: {}", organizations.len());

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.resolve_page_timeout_secs()))
        .connect_timeout(std::time::Duration::from_secs(
            config.resolve_connect_timeout_secs(),
        ))
        .build()?;

    let state = PipelineState::new(http_client, config);

    // Operator prompt: when a challenge suspends the pipeline, ring the
    // terminal bell and resume on Enter once the human has cleared it.
    let gate = state.suspend.clone();
    tokio::spawn(async move {
        loop {
            let reason = gate.wait_until_paused().await;
            eprint!("\x07");
            eprintln!("Challenge detected ({reason}). Solve it, then press Enter to resume...");
            let _ = tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)
            })
            .await;
            gate.resume();
        }
    });

    let (records, summary) = campus_scout::pipeline::run(&state, &organizations).await;

    tabular::write_output(&output_path, &records)?;

    info!(
        "Found information for {} unique clubs ({} total email contacts) in {}ms",
        records.len(),
        summary.emails_found,
        summary.total_duration_ms
    );
    info!("Results written to: {}", output_path.display());

    Ok(())
}
