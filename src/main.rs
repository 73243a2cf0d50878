use anyhow::{Context, Result};
use polypal::chat::ChatSession;
use polypal::integration::ChatConfig;
use polypal::ui::PolypalApp;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polypal=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ChatConfig::from_env();
    config.validate().context("Invalid configuration")?;
    info!("Starting Polypal, conversations in {}", config.data_dir.display());

    let session = ChatSession::open(config).context("Failed to start chat session")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([520.0, 360.0])
            .with_title("Polypal"),
        ..Default::default()
    };

    eframe::run_native(
        "Polypal",
        options,
        Box::new(|cc| Ok(Box::new(PolypalApp::new(cc, session)))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))
}
