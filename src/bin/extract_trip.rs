use anyhow::{Result, bail};

use trip_relay::TripPlanner;
use trip_relay::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Minimal stderr tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        bail!("usage: extract_trip <trip description>");
    }

    let config = Config::load();
    let planner = TripPlanner::from_config(&config).await?;

    match planner.extractor.extract(&text).await? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        None => bail!("No trip extracted; try rephrasing the description"),
    }
}
