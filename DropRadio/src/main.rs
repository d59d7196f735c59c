use dropconfig::get_config;
use dropplaylist::FfprobeDuration;
use dropserver::{LoggingOptions, Server};
use dropstream::{StreamConfigExt, StreamServerExt, StreamService};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========
    let config = get_config();

    let mut server = Server::new_configured();
    server
        .init_logging(LoggingOptions::from_config(&config))
        .await;

    let server_info = server.info();
    server
        .add_route("/info", move || {
            let server_info = server_info.clone();
            async move {
                serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "server": server_info,
                })
            }
        })
        .await;

    // ========== PHASE 2 : Radio ==========
    info!("🎵 Reading playlist...");
    let settings = config.get_stream_settings()?;
    let service = StreamService::prepare(settings, &FfprobeDuration).await?;
    info!(
        "✅ {} track(s), {} µs per loop, starting at {}",
        service.playlist().len(),
        service.playlist().duration(),
        service.settings().start.instant().to_rfc3339()
    );

    server.init_stream(&service).await;

    // ========== PHASE 3 : Démarrage ==========
    info!("🌐 Starting HTTP server...");
    server.start().await?;

    let running = service.start().await?;
    let handle = server.handle();
    let stream_task = tokio::spawn(async move {
        let result = running.wait().await;
        if let Err(e) = &result {
            error!("Stream stopped: {}", e);
        }
        info!("Shutting server down...");
        handle.shutdown();
        result
    });

    info!("✅ DropRadio is on air!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    if stream_task.is_finished() {
        stream_task.await??;
    } else {
        // Ctrl+C : l'encodeur est arrêté avec la tâche
        stream_task.abort();
    }

    Ok(())
}
