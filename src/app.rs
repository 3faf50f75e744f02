// Application loop: consumes WebSocket events, drives comparisons, replies.
//
// One request at a time — the page blocks on its single trigger action, so
// there is no cross-request state to manage. Every comparison builds its own
// request-scoped context and drops it once the reply is sent.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::compare::{build_report, run_comparison, CompareError};
use crate::config::Config;
use crate::export::export_raw_csv;
use crate::lookup::IdentityService;
use crate::protocol::{ClientRequest, ComparisonReport, ErrorKind, ServerMessage};
use crate::statcast::PitchSource;
use crate::ws_server::WsEvent;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The application state: configuration, the two external-service clients,
/// and the reply channel of the currently connected page (if any).
pub struct AppState<I, S> {
    pub config: Config,
    pub identity: I,
    pub source: S,
    reply: Option<mpsc::Sender<String>>,
}

impl<I, S> AppState<I, S>
where
    I: IdentityService,
    S: PitchSource,
{
    pub fn new(config: Config, identity: I, source: S) -> Self {
        Self {
            config,
            identity,
            source,
            reply: None,
        }
    }

    async fn send_reply(&self, message: &ServerMessage) {
        let Some(reply) = &self.reply else {
            warn!("dropping reply: no page connected");
            return;
        };
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to encode reply: {e}");
                return;
            }
        };
        if reply.send(text).await.is_err() {
            warn!("dropping reply: page connection closed");
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Consume WebSocket events until the server side closes the channel.
pub async fn run<I, S>(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    mut state: AppState<I, S>,
) -> anyhow::Result<()>
where
    I: IdentityService,
    S: PitchSource,
{
    while let Some(event) = ws_rx.recv().await {
        match event {
            WsEvent::Connected { addr, reply } => {
                info!("page connected from {addr}");
                state.reply = Some(reply);
            }
            WsEvent::Disconnected => {
                info!("page disconnected");
                state.reply = None;
            }
            WsEvent::Message(text) => {
                let response = handle_request(&state, &text).await;
                state.send_reply(&response).await;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

/// Parse one client frame, run the pipeline, and map the outcome onto the
/// wire protocol. Never panics on bad input; unparseable frames come back as
/// `bad_request` and the connection stays open.
pub async fn handle_request<I, S>(state: &AppState<I, S>, text: &str) -> ServerMessage
where
    I: IdentityService,
    S: PitchSource,
{
    let request: ClientRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            return ServerMessage::Error {
                kind: ErrorKind::BadRequest,
                message: format!("unrecognized request: {e}"),
            };
        }
    };

    let range = request.date_range();
    let ClientRequest::Compare {
        pitcher_a,
        pitcher_b,
        ..
    } = &request;

    match run_comparison(&state.identity, &state.source, pitcher_a, pitcher_b, &range).await {
        Ok(ctx) => {
            let mut report = build_report(&ctx);
            attach_exports(&mut report, state, &ctx);
            ServerMessage::Comparison(report)
        }
        Err(e) => {
            let kind = match &e {
                CompareError::IdentityNotFound { .. } => ErrorKind::IdentityNotFound,
                CompareError::EmptyDataSet { .. } => ErrorKind::EmptyDataSet,
                CompareError::Lookup { .. } | CompareError::Fetch { .. } => ErrorKind::Transport,
            };
            warn!("comparison failed: {e}");
            ServerMessage::Error {
                kind,
                message: e.to_string(),
            }
        }
    }
}

/// Write both CSV artifacts and record their paths on the report. A failed
/// write is logged and leaves that pitcher's path unset; the comparison
/// itself has already passed the gate at this point.
fn attach_exports<I, S>(
    report: &mut ComparisonReport,
    state: &AppState<I, S>,
    ctx: &crate::compare::ComparisonContext,
) {
    let dir = Path::new(&state.config.export_dir);
    let pairs = [
        (&mut report.pitcher_a, &ctx.pitcher_a),
        (&mut report.pitcher_b, &ctx.pitcher_b),
    ];
    for (side, pitcher) in pairs {
        match export_raw_csv(dir, &pitcher.identity.display_name, &pitcher.data.raw_csv) {
            Ok(path) => side.export_path = Some(path.display().to_string()),
            Err(e) => warn!("export failed for {}: {e}", pitcher.identity.display_name),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
