use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::controllers::message_controller::MessageController;
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::message_dto::{AssignStaffRequest, ChatEvent, SendMessageRequest};
use crate::middleware::auth::{authenticate, AuthenticatedUser};
use crate::models::message::{Message, MessageAssignment};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_message_router() -> Router<AppState> {
    Router::new()
        .route("/", post(send_message))
        .route("/assignments", get(my_assignments))
        .route("/conversations/:customer_id", get(conversation))
        .route("/conversations/:customer_id/read", post(mark_read))
        .route("/conversations/:customer_id/assign", post(assign_staff))
        .route("/conversations/:customer_id/close", post(close_conversation))
}

/// Browsers can't set headers on a WebSocket handshake, so the access
/// token travels in the query string.
pub fn create_chat_socket_router() -> Router<AppState> {
    Router::new().route("/ws", get(chat_socket))
}

#[derive(Debug, Deserialize)]
struct SocketQuery {
    token: String,
}

async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<Message>>, AppError> {
    let controller = MessageController::new(&state);
    Ok(Json(controller.send(&user, request).await?))
}

async fn my_assignments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<MessageAssignment>>>, AppError> {
    let controller = MessageController::new(&state);
    Ok(Json(controller.my_assignments(&user).await?))
}

async fn conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<Message>>>, AppError> {
    let controller = MessageController::new(&state);
    Ok(Json(controller.conversation(&user, customer_id, &query).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<ApiResponse<u64>>, AppError> {
    let controller = MessageController::new(&state);
    Ok(Json(controller.mark_read(&user, customer_id).await?))
}

async fn assign_staff(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<AssignStaffRequest>,
) -> Result<Json<ApiResponse<MessageAssignment>>, AppError> {
    let controller = MessageController::new(&state);
    Ok(Json(controller.assign(&user, customer_id, request).await?))
}

async fn close_conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = MessageController::new(&state);
    Ok(Json(controller.close(&user, customer_id).await?))
}

async fn chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
) -> Result<Response, AppError> {
    let user = authenticate(&query.token, &state.config.jwt)?;
    Ok(ws.on_upgrade(move |socket| handle_chat_socket(socket, state, user)))
}

async fn handle_chat_socket(socket: WebSocket, state: AppState, user: AuthenticatedUser) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.chat.subscribe();
    // Respuestas directas a este socket (errores)
    let (reply_tx, mut reply_rx) = mpsc::channel::<ChatEvent>(16);
    let user_id = user.user_id;
    debug!(%user_id, "Chat socket opened");

    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                received = events.recv() => match received {
                    Ok(envelope) if envelope.is_for(user_id) => envelope.event,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%user_id, skipped, "Chat socket lagging behind");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(event) => event,
                    None => break,
                },
            };
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(WsMessage::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let controller = MessageController::new(&state);
    while let Some(Ok(frame)) = receiver.next().await {
        match frame {
            WsMessage::Text(text) => {
                let outcome = match serde_json::from_str::<SendMessageRequest>(&text) {
                    Ok(request) => controller.send(&user, request).await.map(|_| ()),
                    Err(e) => Err(AppError::BadRequest(format!("Invalid chat frame: {}", e))),
                };
                if let Err(e) = outcome {
                    let event = ChatEvent::Error { message: e.to_string() };
                    if reply_tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    debug!(%user_id, "Chat socket closed");
}
