pub mod api;
pub mod app;
pub mod bucket;
pub mod chart;
pub mod config;
pub mod flagged;
pub mod generator;
pub mod logging;
pub mod poll;
pub mod probe;
pub mod scheduler;
pub mod state;
pub mod tui;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
