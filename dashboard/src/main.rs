use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use traffic_dashboard::api::StatsClient;
use traffic_dashboard::config::{Cli, Commands};
use traffic_dashboard::probe::{self, ProbeOptions};
use traffic_dashboard::{app, logging};

// 単一スレッドの協調スケジューリングで動かす
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.dashboard_config()?;

    match cli.selected_command() {
        Commands::Watch => {
            logging::init_file(&config.log_file)?;
            app::run(config).await
        }
        Commands::Probe {
            count,
            interval_ms,
            stop_on,
        } => {
            logging::init_stderr()?;
            let client = StatsClient::new(&config.base_url);
            let options = ProbeOptions {
                count,
                interval: Duration::from_millis(interval_ms),
                stop_on,
            };
            probe::run(&client, &options).await;
            Ok(())
        }
    }
}
