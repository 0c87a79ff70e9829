use std::sync::Arc;

use honeypot::api::api_routes;
use honeypot::config;
use honeypot::pipeline::orchestrator::{self, ConversationOrchestrator};
use honeypot::report::{HttpReportSink, LogReportSink, ReportSink};
use honeypot::session::SessionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let (server_config, pipeline_config) = config::load()?;

    eprintln!("🍯 Honeypot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/analyze-message", server_config.port);
    eprintln!(
        "   Scam threshold: {}, messages: {}..{}, timeout: {}m",
        pipeline_config.scam_threshold,
        pipeline_config.min_messages_before_report,
        pipeline_config.max_messages_per_session,
        pipeline_config.session_timeout.as_secs() / 60,
    );

    // ── Report sink ──────────────────────────────────────────────────────
    let sink: Arc<dyn ReportSink> = match &server_config.report_url {
        Some(url) => {
            eprintln!("   Reports: POST {url}");
            Arc::new(HttpReportSink::new(url.clone()))
        }
        None => {
            eprintln!("   Reports: log only (HONEYPOT_REPORT_URL not set)");
            Arc::new(LogReportSink)
        }
    };

    // ── Sessions ─────────────────────────────────────────────────────────
    let store = SessionStore::new();
    let sweep_interval = pipeline_config.sweep_interval;
    let conversations = Arc::new(ConversationOrchestrator::new(pipeline_config, store, sink));

    // Spawn idle-session sweep
    let _expiry_handle = orchestrator::spawn_expiry_task(Arc::clone(&conversations), sweep_interval);

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = api_routes(conversations, server_config.api_key);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", server_config.port)).await?;
    tracing::info!(port = server_config.port, "Honeypot API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
