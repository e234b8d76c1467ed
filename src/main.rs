use std::sync::Arc;

use futures::StreamExt;

use polyglot_bot::bot::TurnRouter;
use polyglot_bot::channels::{Channel, CliChannel, Reply};
use polyglot_bot::config::BotConfig;
use polyglot_bot::dialogs::{DialogCatalog, profile};
use polyglot_bot::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🌐 Polyglot Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Default language: {}", config.default_language);
    eprintln!("   Type a language code (en, ko, es) or any text.");
    eprintln!("   /profile captures your name, /hello greets you, /cancel stops a dialog. /quit to exit.\n");

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);

    // ── Dialogs ──────────────────────────────────────────────────────────
    let mut catalog = DialogCatalog::new();
    profile::register(&mut catalog)?;
    tracing::debug!(dialogs = ?catalog.ids(), "Dialog catalog ready");

    let router = TurnRouter::new(db, Arc::new(catalog), &config);

    // ── Channel loop ─────────────────────────────────────────────────────
    let channel = CliChannel::new(config.user_id.clone());
    let mut stream = channel.start().await?;
    tracing::info!(channel = channel.name(), "Polyglot bot ready and listening");

    while let Some(activity) = stream.next().await {
        let text = activity.text().map(str::trim);
        let result = match text.and_then(profile::dialog_for_command) {
            Some(dialog_id) => router.begin_dialog(&activity, dialog_id, None, &channel).await,
            None if text == Some("/cancel") => router.cancel_dialogs(&activity, &channel).await,
            None => router.on_turn(&activity, &channel).await,
        };
        if let Err(e) = result {
            tracing::error!("Error handling activity: {}", e);
            let notice = Reply::text(format!("Error: {}", e));
            if let Err(e) = channel.respond(&activity, notice).await {
                tracing::warn!("Failed to report error: {}", e);
            }
        }
    }

    channel.shutdown().await?;
    tracing::info!("Polyglot bot shutting down...");
    Ok(())
}
