use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::message::Message;

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Conversation to post into; customers may omit it.
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignStaffRequest {
    pub staff_id: Uuid,
}

/// Events pushed over the chat WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Message { message: Message },
    Read { customer_id: Uuid, reader_id: Uuid },
    Assigned { customer_id: Uuid, staff_id: Uuid },
    Error { message: String },
}
