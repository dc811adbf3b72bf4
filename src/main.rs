mod app;
mod panel;

use anyhow::Context;
use eframe::{egui, NativeOptions};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("estimator=info")),
        )
        .init();

    let settings = estimator::config::Settings::load();
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_decorations(false)
            .with_resizable(true)
            .with_inner_size([1400.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Frame Estimator",
        options,
        Box::new(|cc| Ok(Box::new(app::EstimatorApp::new(cc, settings)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("failed to run the estimator window")
}
