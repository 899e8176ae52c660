use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::message_dto::{AssignStaffRequest, ChatEvent, SendMessageRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::message::{least_loaded, Message, MessageAssignment};
use crate::models::role::RoleName;
use crate::repositories::message_repository::MessageRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::chat_hub::ChatHub;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, AppError};

pub struct MessageController {
    repository: MessageRepository,
    users: UserRepository,
    chat: ChatHub,
}

impl MessageController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: MessageRepository::new(state.pool.clone()),
            users: UserRepository::new(state.pool.clone()),
            chat: state.chat.clone(),
        }
    }

    /// Customers talk in their own conversation; staff in conversations
    /// assigned to them; admins anywhere. Returns the active assignment.
    async fn authorize(&self, actor: &AuthenticatedUser, customer_id: Uuid) -> Result<Option<MessageAssignment>, AppError> {
        let assignment = self.repository.active_assignment(customer_id).await?;
        if actor.user_id == customer_id || actor.is_admin() {
            return Ok(assignment);
        }
        match &assignment {
            Some(a) if actor.is_staff() && a.staff_id == actor.user_id => Ok(assignment),
            _ => Err(forbidden_error("access conversation", "conversation is not assigned to you")),
        }
    }

    fn recipients(customer_id: Uuid, assignment: Option<&MessageAssignment>) -> Vec<Uuid> {
        let mut recipients = vec![customer_id];
        if let Some(a) = assignment {
            recipients.push(a.staff_id);
        }
        recipients
    }

    /// First message of an unassigned customer goes to the least loaded staff member.
    async fn auto_assign(&self, customer_id: Uuid) -> Result<Option<MessageAssignment>, AppError> {
        let loads = self.users.staff_loads().await?;
        let Some(staff_id) = least_loaded(&loads) else {
            warn!(%customer_id, "No staff available for conversation");
            return Ok(None);
        };
        let assignment = self.repository.assign_if_unassigned(customer_id, staff_id).await?;
        if assignment.staff_id == staff_id {
            info!(%customer_id, %staff_id, "Conversation auto-assigned");
            self.chat.publish(
                vec![customer_id, staff_id],
                ChatEvent::Assigned { customer_id, staff_id },
            );
        }
        Ok(Some(assignment))
    }

    pub async fn send(&self, actor: &AuthenticatedUser, request: SendMessageRequest) -> Result<ApiResponse<Message>, AppError> {
        request.validate()?;

        let customer_id = match request.customer_id {
            Some(id) => id,
            None if actor.has_role(RoleName::Customer) => actor.user_id,
            None => return Err(AppError::BadRequest("customer_id is required".to_string())),
        };
        if customer_id == actor.user_id && !actor.has_role(RoleName::Customer) {
            return Err(forbidden_error("send message", "only customers own conversations"));
        }

        let mut assignment = self.authorize(actor, customer_id).await?;
        if assignment.is_none() && actor.user_id == customer_id {
            assignment = self.auto_assign(customer_id).await?;
        }

        let message = Message {
            id: Uuid::new_v4(),
            customer_id,
            sender_id: actor.user_id,
            content: request.content.trim().to_string(),
            is_read: false,
            sent_at: Utc::now(),
            is_deleted: false,
        };
        if message.content.is_empty() {
            return Err(AppError::BadRequest("Message content cannot be blank".to_string()));
        }
        let created = self.repository.insert(&message).await?;

        let mut recipients = Self::recipients(customer_id, assignment.as_ref());
        recipients.push(actor.user_id);
        self.chat.publish(recipients, ChatEvent::Message { message: created.clone() });
        Ok(ApiResponse::success(created))
    }

    pub async fn conversation(&self, actor: &AuthenticatedUser, customer_id: Uuid, query: &PageQuery) -> Result<ApiResponse<PageResponse<Message>>, AppError> {
        self.authorize(actor, customer_id).await?;
        let (messages, total) = self
            .repository
            .conversation(customer_id, query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(messages, query, total)))
    }

    pub async fn mark_read(&self, actor: &AuthenticatedUser, customer_id: Uuid) -> Result<ApiResponse<u64>, AppError> {
        let assignment = self.authorize(actor, customer_id).await?;
        let changed = self.repository.mark_read(customer_id, actor.user_id).await?;
        if changed > 0 {
            self.chat.publish(
                Self::recipients(customer_id, assignment.as_ref()),
                ChatEvent::Read { customer_id, reader_id: actor.user_id },
            );
        }
        Ok(ApiResponse::success_with_message(changed, "Messages marked as read"))
    }

    /// Hands the conversation to `staff_id`, closing any current assignment.
    pub async fn assign(&self, actor: &AuthenticatedUser, customer_id: Uuid, request: AssignStaffRequest) -> Result<ApiResponse<MessageAssignment>, AppError> {
        actor.require_staff("assign conversations")?;
        let staff_id = request.staff_id;
        let is_staff = self.users.has_role(staff_id, RoleName::Staff.as_str()).await?
            || self.users.has_role(staff_id, RoleName::Admin.as_str()).await?;
        if !is_staff {
            return Err(AppError::BadRequest(format!("User {} is not a staff member", staff_id)));
        }

        let previous = self.repository.active_assignment(customer_id).await?;
        let assignment = self.repository.reassign(customer_id, staff_id).await?;

        let mut recipients = vec![customer_id, staff_id];
        if let Some(previous) = previous {
            recipients.push(previous.staff_id);
        }
        self.chat.publish(recipients, ChatEvent::Assigned { customer_id, staff_id });
        info!(%customer_id, %staff_id, by = %actor.user_id, "Conversation reassigned");
        Ok(ApiResponse::success_with_message(assignment, "Conversation assigned"))
    }

    pub async fn close(&self, actor: &AuthenticatedUser, customer_id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("close conversations")?;
        self.authorize(actor, customer_id).await?;
        if !self.repository.close(customer_id).await? {
            return Err(AppError::NotFound(format!("No active assignment for customer {}", customer_id)));
        }
        Ok(ApiResponse::message("Conversation closed"))
    }

    pub async fn my_assignments(&self, actor: &AuthenticatedUser) -> Result<ApiResponse<Vec<MessageAssignment>>, AppError> {
        actor.require_staff("list assigned conversations")?;
        Ok(ApiResponse::success(self.repository.assignments_for_staff(actor.user_id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipients_include_assigned_staff() {
        let customer_id = Uuid::new_v4();
        let staff_id = Uuid::new_v4();
        let assignment = MessageAssignment {
            id: Uuid::new_v4(),
            customer_id,
            staff_id,
            is_active: true,
            assigned_at: Utc::now(),
            closed_at: None,
        };

        assert_eq!(MessageController::recipients(customer_id, None), vec![customer_id]);
        assert_eq!(
            MessageController::recipients(customer_id, Some(&assignment)),
            vec![customer_id, staff_id]
        );
    }
}
