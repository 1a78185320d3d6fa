use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meeting_stream::{
    create_router, Config, ConnectionState, HttpSessionApi, SessionApi, SessionController,
    StartSessionRequest, StreamClient, ViewState,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "meeting-stream", version, about = "Live meeting analysis stream client")]
struct Cli {
    /// Config file path (extension optional)
    #[arg(long, global = true, default_value = "config/meeting-stream")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print backend health
    Health,
    /// List sessions the backend is running
    Sessions,
    /// Follow an existing session until it finalizes
    Watch {
        session_id: String,

        /// Also serve the viewer API
        #[arg(long)]
        serve: bool,
    },
    /// Start a session, stream until Ctrl+C, then stop and print the summary
    Record {
        #[arg(long)]
        name: Option<String>,

        /// Also serve the viewer API
        #[arg(long)]
        serve: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Streaming endpoint: {}", cfg.stream.endpoint);
    info!("Session API: {}", cfg.api.base_url);

    let api = Arc::new(HttpSessionApi::new(cfg.api.base_url.clone()));

    match cli.command {
        Command::Health => {
            let health = api.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Command::Sessions => {
            let sessions = api.list_active_sessions().await?;
            if sessions.is_empty() {
                info!("No active sessions");
            }
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        Command::Watch { session_id, serve } => watch(&cfg, &session_id, serve).await?,
        Command::Record { name, serve } => record(&cfg, api, name, serve).await?,
    }

    Ok(())
}

/// Build a client with logging observers, optionally publishing to the viewer API.
async fn build_client(cfg: &Config, serve: bool) -> Result<StreamClient> {
    let mut client = StreamClient::websocket(cfg.stream.connection_settings());

    client.on_connection_change(|change| info!("Connection: {:?}", change));
    client.on_chunk(|chunk| {
        info!(
            "[{}] chunk {} ({:.1}s-{:.1}s): {}",
            chunk.session_id,
            chunk.chunk_id,
            chunk.start_time,
            chunk.end_time,
            chunk.micro_summary.as_deref().unwrap_or(&chunk.transcript_text)
        )
    });
    client.on_summary(|summary| {
        info!(
            "[{}] final summary: {} chunks, {:.1}s",
            summary.session_id, summary.total_chunks, summary.total_duration
        )
    });
    client.on_status(|update| {
        if let Some(status) = update.session_status {
            info!("Session status now {}", status);
        }
    });

    if serve {
        let view = ViewState::new();
        serve_view(cfg, view.clone()).await?;
        client.attach_view(view).await;
    }

    Ok(client)
}

async fn serve_view(cfg: &Config, view: ViewState) -> Result<()> {
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind viewer API on {}", addr))?;

    info!("Viewer API listening on http://{}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, create_router(view)).await {
            error!("Viewer API stopped: {}", e);
        }
    });
    Ok(())
}

async fn watch(cfg: &Config, session_id: &str, serve: bool) -> Result<()> {
    let mut client = build_client(cfg, serve).await?;
    client.connect(&cfg.stream.endpoint).await?;
    client.subscribe(session_id).await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            event = client.next_event() => {
                event?;
                let finished = client
                    .get_aggregate(session_id)
                    .map_or(true, |aggregate| aggregate.is_frozen());
                if finished {
                    break;
                }
            }
        }
    }

    if let Some(summary) = client.get_final_summary(session_id) {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else if let Some(snapshot) = client.snapshot(session_id) {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    client.disconnect().await;
    Ok(())
}

async fn record(
    cfg: &Config,
    api: Arc<HttpSessionApi>,
    name: Option<String>,
    serve: bool,
) -> Result<()> {
    let client = build_client(cfg, serve).await?;
    let mut controller = SessionController::new(client, api);
    controller
        .client_mut()
        .connect(&cfg.stream.endpoint)
        .await?;

    let request = StartSessionRequest {
        session_name: Some(name.unwrap_or_else(|| format!("meeting-{}", uuid::Uuid::new_v4()))),
        ..Default::default()
    };
    let session_id = controller.start(request).await?.session_id;
    info!("Recording session {} (Ctrl+C to stop)", session_id);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let interrupted = loop {
        tokio::select! {
            _ = &mut ctrl_c => break true,
            event = controller.next_event() => {
                event?;
                if controller.status(&session_id).map_or(true, |s| s.is_terminal()) {
                    break false;
                }
            }
        }
    };

    if interrupted {
        // Ctrl+C may land mid-reconnect; finish it so the stop can go out
        while controller.client().connection_state() == ConnectionState::Reconnecting {
            controller.next_event().await?;
        }
        controller.stop(&session_id).await?;
        let status = controller.wait_for_completion(&session_id).await?;
        info!("Session {} finished as {}", session_id, status);
    } else {
        warn!("Session {} ended before it was stopped", session_id);
    }

    let client = controller.client_mut();
    if let Some(summary) = client.get_final_summary(&session_id) {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    client.acknowledge_completion(&session_id).await;
    client.disconnect().await;
    Ok(())
}
