use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, ensure};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "traffic-dashboard")]
#[command(about = "Terminal dashboard for request activity and flagged sources")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the stats server
    #[arg(long, global = true, env = "DASHBOARD_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Global chart and flagged list refresh period
    #[arg(long, global = true, env = "DASHBOARD_POLL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Spam mode request period
    #[arg(long, global = true, env = "DASHBOARD_SPAM_MS", default_value_t = 250)]
    pub spam_interval_ms: u64,

    /// Re-poll the selected key's history at this period (single-shot when unset)
    #[arg(long, global = true, env = "DASHBOARD_DRILLDOWN_MS")]
    pub drilldown_refresh_ms: Option<u64>,

    /// Where the dashboard writes its own logs
    #[arg(long, global = true, env = "DASHBOARD_LOG_FILE", default_value = "traffic-dashboard.log")]
    pub log_file: PathBuf,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the terminal dashboard (default)
    Watch,

    /// Fire a burst of requests and print each status
    Probe {
        #[arg(short, long, default_value_t = 12)]
        count: usize,

        #[arg(short, long, default_value_t = 100)]
        interval_ms: u64,

        /// Stop once a status containing this text is seen
        #[arg(long)]
        stop_on: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub spam_interval: Duration,
    pub drilldown_interval: Option<Duration>,
    pub log_file: PathBuf,
}

impl Cli {
    pub fn selected_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Watch)
    }

    pub fn dashboard_config(&self) -> Result<DashboardConfig> {
        ensure!(self.poll_interval_ms > 0, "--poll-interval-ms must be greater than 0");
        ensure!(self.spam_interval_ms > 0, "--spam-interval-ms must be greater than 0");
        ensure!(
            self.drilldown_refresh_ms != Some(0),
            "--drilldown-refresh-ms must be greater than 0"
        );
        ensure!(
            self.base_url.starts_with("http://") || self.base_url.starts_with("https://"),
            "--base-url must start with http:// or https://"
        );

        Ok(DashboardConfig {
            base_url: self.base_url.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            spam_interval: Duration::from_millis(self.spam_interval_ms),
            drilldown_interval: self.drilldown_refresh_ms.map(Duration::from_millis),
            log_file: self.log_file.clone(),
        })
    }
}
