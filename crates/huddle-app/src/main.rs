mod cli;
mod scenario;

use std::sync::Arc;

use huddle_call::{CallController, HttpCallLifecycle, LoopbackEngine, SessionClient};
use huddle_common::MediaError;
use huddle_config::HuddleConfig;
use tracing_subscriber::EnvFilter;

const LOOPBACK_APP_ID: &str = "huddle-loopback";

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let args = cli::parse();

    // Load config before logging so its level can seed the filter
    let loaded = match &args.config {
        Some(path) => huddle_config::load_config_from(path),
        None => huddle_config::load_config(),
    };

    // Initialize logging
    let log_directive = args.log_level.clone().unwrap_or_else(|| match &loaded {
        Ok(config) => format!("huddle={}", config.logging.level.as_directive()),
        Err(_) => "huddle=info".to_string(),
    });
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
            ),
        )
        .init();

    tracing::info!("Huddle v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        HuddleConfig::default()
    });
    if config.engine.app_id.is_empty() {
        config.engine.app_id = LOOPBACK_APP_ID.to_string();
    }

    let engine = Arc::new(LoopbackEngine::new());
    if args.deny_devices {
        engine.deny_devices(MediaError::PermissionDenied(
            "camera and microphone blocked".into(),
        ));
    }

    let client = SessionClient::new(engine.clone(), config.clone());
    let mut controller =
        CallController::new(client).with_directory(Arc::new(scenario::directory(args.peers)));
    if config.lifecycle.enabled {
        match HttpCallLifecycle::from_config(&config.lifecycle) {
            Ok(lifecycle) => controller = controller.with_lifecycle(Arc::new(lifecycle)),
            Err(e) => tracing::warn!("Lifecycle service disabled: {e}"),
        }
    }

    let logger = tokio::spawn(scenario::log_events(controller.subscribe()));

    if let Err(e) = scenario::run(&engine, &controller, &args).await {
        tracing::error!("Scripted call failed: {e}");
    }

    controller.client().shutdown().await;
    drop(controller);
    logger.abort();
    tracing::info!("Shutdown complete");
}
