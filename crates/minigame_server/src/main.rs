//! Main application entry point for the minigame server.
//!
//! Provides CLI interface, configuration loading, and server startup with
//! the tick loop, session directory, and graceful shutdown handling.

use chat_client::{ChatCompletion, OpenAiClient};
use group_hardcore::{GroupHardcore, GRACE_TICKS};
use minigame_core::{ItemFactories, Minigame};
use minigame_host::{Host, World};
use minigame_server::{AppConfig, CliArgs, LoggingSettings, SessionDirectory};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging system.
fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .init();
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Setup graceful shutdown signal handling.
async fn setup_signal_handlers() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("📡 Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("📡 Received Ctrl+C");
    }

    Ok(())
}

/// Main application struct tying host, directory, and config together.
pub struct Application {
    config: AppConfig,
    host: Arc<Host>,
    directory: Arc<SessionDirectory>,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        // Load configuration first (before logging setup).
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides.
        if let Some(worlds_dir) = args.worlds_dir {
            config.server.worlds_root = worlds_dir.to_string_lossy().to_string();
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {}", e).into());
        }

        setup_logging(&config.logging, args.json_logs)?;

        let host = Arc::new(Host::new(&config.server.worlds_root));
        let lobby = lobby_world(&host, &config.server.lobby_world)?;

        if config.openai.api_key.is_empty() {
            warn!("openai.api_key is empty; wish granting will fail until it is set");
        }
        let chat: Arc<dyn ChatCompletion> = Arc::new(OpenAiClient::new(
            &config.openai.api_key,
            &config.openai.model,
            Duration::from_secs(config.openai.timeout_secs),
        )?);

        let directory = Arc::new(SessionDirectory::new());
        {
            let host = Arc::clone(&host);
            let event_window = config.event_window();
            directory.register_mode(
                "group_hardcore",
                Box::new(move || {
                    GroupHardcore::with_event_window(
                        Arc::clone(&host),
                        Arc::clone(&lobby),
                        ItemFactories::standard(Arc::clone(&chat)),
                        event_window.clone(),
                    ) as Arc<dyn Minigame>
                }),
            );
        }

        info!("🚀 Minigame Server v1.0.0");
        info!(
            "📂 Config: {} | Worlds: {}",
            args.config_path.display(),
            config.server.worlds_root
        );

        Ok(Self {
            config,
            host,
            directory,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Minigame Server Application");
        info!("📋 Configuration Summary:");
        info!("  🌍 Worlds root: {}", self.config.server.worlds_root);
        info!("  🏠 Lobby world: {}", self.config.server.lobby_world);
        info!("  ⏱️ Tick interval: {}ms", self.config.server.tick_interval_ms);
        info!(
            "  🎲 Event window: {}..{} ticks",
            self.config.server.event_window_min, self.config.server.event_window_max
        );
        info!("  🎮 Modes: {}", self.directory.mode_names().join(", "));

        // The tick loop: all game logic advances here, one tick at a time.
        let host = Arc::clone(&self.host);
        let tick_interval = Duration::from_millis(self.config.server.tick_interval_ms);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                host.tick();
            }
        });

        info!("✅ Server is running. Press Ctrl+C to stop.");
        setup_signal_handlers().await?;

        info!("🛑 Shutting down...");
        ticker.abort();

        // End every live session, then drain the grace-delayed teardown
        // tasks so worlds are deleted before the process exits.
        for session in self.directory.list() {
            if let Err(err) = self.directory.stop(&session.code) {
                warn!(code = %session.code, %err, "failed to stop session");
            }
        }
        for _ in 0..(GRACE_TICKS * 2) {
            self.host.tick();
        }

        info!("👋 Shutdown complete");
        Ok(())
    }
}

/// Fetch the lobby world, creating it on first boot.
fn lobby_world(host: &Arc<Host>, name: &str) -> Result<Arc<World>, Box<dyn std::error::Error>> {
    if let Some(world) = host.worlds.get_by_name(name) {
        return Ok(world);
    }
    let world = host.create_world(Some(name), false)?;
    info!(world = %world.name, "lobby world created");
    Ok(world)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let app = Application::new(args).await?;
    app.run().await
}
