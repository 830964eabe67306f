use crate::modules::{
    auth::AuthenticatedUser,
    leaderboard::hub::{ClientEvent, ServerEvent, SubscriberHub},
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

/// Live leaderboard socket. The caller is subscribed to its own channel on connect;
/// a `join_leaderboard` message is acknowledged but never changes the channel.
pub async fn leaderboard_socket(
    ws: WebSocketUpgrade,
    user: AuthenticatedUser,
    Extension(hub): Extension<Arc<SubscriberHub>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, user.id, hub))
}

async fn serve_subscriber(socket: WebSocket, user_id: Uuid, hub: Arc<SubscriberHub>) {
    let mut updates = hub.subscribe(user_id);
    let (mut sender, mut receiver) = socket.split();
    tracing::info!("leaderboard subscriber connected: {}", user_id);

    loop {
        tokio::select! {
            message = receiver.next() => match message {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::JoinLeaderboard) => {
                        let Ok(ack) = serde_json::to_string(&ServerEvent::Joined) else {
                            continue;
                        };
                        if sender.send(Message::Text(ack)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!("ignored message from {}: {}", user_id, e),
                },
                Some(Ok(Message::Ping(payload))) => {
                    if sender.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            update = updates.recv() => match update {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("subscriber {} skipped {} update(s)", user_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    drop(updates);
    hub.release(user_id);
    tracing::info!("leaderboard subscriber disconnected: {}", user_id);
}
