mod capabilities;
mod config;
mod errors;
mod location;
mod operations;
mod orchestrator;
mod providers;
mod sse;
mod util;

use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use crate::{
    errors::Result,
    orchestrator::{LabController, broadcast_error},
    sse::{BroadcastSender, LabRequest, SignatureAuth},
    util::{format_local, now_local},
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;
    let sse_config = config.sse.clone();
    let bind_addr = sse_config.bind_addr;
    let auth = Arc::new(SignatureAuth::new(
        sse_config.access_key.clone(),
        sse_config.secret_key.clone(),
        sse_config.signature_ttl,
    ));

    let (broadcaster, _bus_rx) = crate::sse::message_bus();
    let (command_tx, mut command_rx) = mpsc::channel(64);

    let mut controller = LabController::new(config, broadcaster.clone()).await?;

    let sse_task = {
        let broadcaster = broadcaster.clone();
        let auth = auth.clone();
        let command_tx = command_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = crate::sse::run_server(bind_addr, auth, broadcaster, command_tx).await
            {
                error!(target: "sse", error = ?err, "lab endpoint stopped unexpectedly");
            }
        })
    };

    broadcast_system_ready(&broadcaster, &controller);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!(target: "lab", "shutdown signal received");
                break;
            }
            request = command_rx.recv() => {
                match request {
                    Some(request) => handle_lab_request(&mut controller, &broadcaster, request).await,
                    None => {
                        error!(target: "lab", "command channel closed, lab endpoint may have exited");
                        break;
                    }
                }
            }
        }
    }

    controller.shutdown().await?;

    sse_task.abort();

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_timer(LocalTimer)
        .init();

    info!("tracing initialized");
}

fn broadcast_system_ready(broadcaster: &BroadcastSender, controller: &LabController) {
    crate::sse::broadcast_json(
        broadcaster,
        "system.ready",
        json!({
            "message": "Liti-jal AI Studio listo",
            "actions": controller.capabilities_overview(),
        }),
    );
}

async fn handle_lab_request(
    controller: &mut LabController,
    broadcaster: &BroadcastSender,
    request: LabRequest,
) {
    let id = request.id;
    let origin = request.command.origin();

    if let Err(err) = controller.handle(request).await {
        error!(target: "lab", request_id = %id, origin, error = %err, "lab request failed");
        broadcast_error(broadcaster, id, origin, &err);
    }
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = now_local();
        write!(w, "{}", format_local(&now, "%Y-%m-%d %H:%M:%S%:z"))
    }
}
