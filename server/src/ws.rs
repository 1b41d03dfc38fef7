//! WebSocket transport: one actor per connected session.
//!
//! The actor parses JSON frames into [`ClientEvent`]s and hands them to the
//! coordinator; a forwarding task drains the session's outbound channel back
//! into the socket. A dropped connection is indistinguishable from an
//! explicit leave once it reaches the coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, Message, StreamHandler};
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc;
use watchroom_protocol::{ClientEvent, ServerEvent, SessionId};

use crate::coordinator::Coordinator;
use crate::session::SessionManager;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state for WebSocket handlers.
pub struct WsState {
    pub coordinator: Arc<Coordinator>,
    pub sessions: Arc<SessionManager>,
}

/// Coordinator event forwarded to the socket.
#[derive(Message)]
#[rtype(result = "()")]
struct OutboundEvent(ServerEvent);

/// WebSocket actor for one session.
pub struct SessionWsActor {
    session_id: SessionId,
    coordinator: Arc<Coordinator>,
    /// Receiver half of the session's outbound channel (taken at start).
    event_rx: Option<mpsc::UnboundedReceiver<ServerEvent>>,
    last_heartbeat: Instant,
}

impl SessionWsActor {
    pub fn new(
        session_id: SessionId,
        coordinator: Arc<Coordinator>,
        event_rx: mpsc::UnboundedReceiver<ServerEvent>,
    ) -> Self {
        Self {
            session_id,
            coordinator,
            event_rx: Some(event_rx),
            last_heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                tracing::debug!(session_id = %act.session_id, "client heartbeat timeout");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn start_forwarder(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some(mut event_rx) = self.event_rx.take() {
            let addr = ctx.address();
            actix::spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    if addr.try_send(OutboundEvent(event)).is_err() {
                        break;
                    }
                }
            });
        }
    }
}

impl Actor for SessionWsActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);
        self.start_forwarder(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.coordinator.handle_disconnect(&self.session_id);
    }
}

impl Handler<OutboundEvent> for SessionWsActor {
    type Result = ();

    fn handle(&mut self, msg: OutboundEvent, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg.0) {
            Ok(frame) => ctx.text(frame),
            Err(e) => {
                tracing::error!(session_id = %self.session_id, error = %e, "failed to encode outbound event");
            }
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SessionWsActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => self.coordinator.handle_event(&self.session_id, event),
                Err(e) => {
                    tracing::debug!(
                        session_id = %self.session_id,
                        error = %e,
                        "ignoring unparseable frame"
                    );
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::debug!(session_id = %self.session_id, "ignoring binary frame");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(session_id = %self.session_id, ?reason, "WebSocket close");
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// HTTP handler to upgrade to a session WebSocket.
pub async fn session_ws(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<WsState>,
) -> Result<HttpResponse, actix_web::Error> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let session_id = state.sessions.register(event_tx);
    tracing::info!(session_id = %session_id, "session connected");

    let actor = SessionWsActor::new(session_id, Arc::clone(&state.coordinator), event_rx);
    ws::start(actor, &req, stream)
}
