//! WebSocket endpoint for real-time updates

use crate::auth::extract_bearer;
use crate::core::broadcast::{ClientId, ServerMessage, UpdateBroadcaster};
use crate::server::state::AppState;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use actix_ws::{Message, MessageStream, Session};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Configure the WebSocket route
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(connect));
}

/// Token from `Authorization: Bearer` or, for browser clients, `?token=`
fn request_token(req: &HttpRequest) -> Option<String> {
    if let Some(token) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
    {
        return Some(token.to_string());
    }
    url::form_urlencoded::parse(req.query_string().as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

/// Authenticate, upgrade, and hand the socket to a session task
async fn connect(
    state: web::Data<AppState>,
    req: HttpRequest,
    stream: web::Payload,
) -> ActixResult<HttpResponse> {
    let claims = state.auth.authenticate(request_token(&req).as_deref())?;
    let (response, session, messages) = actix_ws::handle(&req, stream)?;

    let broadcaster = Arc::clone(&state.broadcaster);
    let (client_id, outbound) = broadcaster.connect(&claims.sub);
    info!(client = %client_id, subject = %claims.sub, "WebSocket client connected");

    actix_web::rt::spawn(run_session(
        broadcaster,
        client_id,
        session,
        messages,
        outbound,
    ));
    Ok(response)
}

/// Pump queued frames out and client frames in until either side closes
async fn run_session(
    broadcaster: Arc<UpdateBroadcaster>,
    client_id: ClientId,
    mut session: Session,
    mut messages: MessageStream,
    mut outbound: mpsc::Receiver<String>,
) {
    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if session.text(frame).await.is_err() {
                    break;
                }
            }
            message = messages.recv() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        broadcaster.dispatch(client_id, text.to_string());
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let reply = ServerMessage::error(
                            "UNSUPPORTED_FRAME",
                            "Binary frames are not supported",
                        );
                        if !send(&mut session, &reply).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        debug!(client = %client_id, "Close frame: {:?}", reason);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(client = %client_id, "WebSocket protocol error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    broadcaster.disconnect(&client_id);
    let _ = session.close(None).await;
    info!(client = %client_id, "WebSocket client disconnected");
}

async fn send(session: &mut Session, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => session.text(text).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode WebSocket reply: {}", e);
            true
        }
    }
}
