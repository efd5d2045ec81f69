//! Stored sessions of the AI travel assistant

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiType {
    Streaming,
    Quick,
    EventBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelDates {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<TravelDates>,
    #[serde(default)]
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Recommendations {
    #[serde(default)]
    pub hotel_ids: Vec<Uuid>,
    #[serde(default)]
    pub tour_ids: Vec<Uuid>,
    #[serde(default)]
    pub event_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Conversion {
    pub booked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
}

pub const ACTIVE: &str = "active";
pub const CONVERTED: &str = "converted";

// `name` holds the session id
crate::impl_data_entity!(AiConversation, "ai_conversation", "ai_conversations", ["user_id", "session_id"], {
    user_id: Uuid,
    session_id: String,
    ai_type: AiType,
    #[serde(default)]
    messages: Vec<AiMessage>,
    #[serde(default)]
    context: ConversationContext,
    #[serde(default)]
    recommendations: Recommendations,
    #[serde(default)]
    conversion: Conversion,
});

impl AiConversation {
    pub fn push_message(&mut self, role: MessageRole, content: String) {
        self.messages.push(AiMessage {
            role,
            content,
            timestamp: Utc::now(),
        });
        self.touch();
    }

    pub fn record_conversion(&mut self, booking_id: Uuid) {
        self.conversion = Conversion {
            booked: true,
            booking_id: Some(booking_id),
        };
        self.set_status(CONVERTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_flow() {
        let mut conversation = AiConversation::new(
            "sess-1".to_string(),
            ACTIVE.to_string(),
            Uuid::new_v4(),
            "sess-1".to_string(),
            AiType::Quick,
            Vec::new(),
            ConversationContext::default(),
            Recommendations::default(),
            Conversion::default(),
        );

        conversation.push_message(MessageRole::User, "Beach hotel under $80?".to_string());
        conversation.push_message(MessageRole::Assistant, "Try Kep.".to_string());
        assert_eq!(conversation.messages.len(), 2);

        let booking_id = Uuid::new_v4();
        conversation.record_conversion(booking_id);
        assert!(conversation.conversion.booked);
        assert_eq!(conversation.status, CONVERTED);
    }

    #[test]
    fn test_ai_type_wire_format() {
        assert_eq!(serde_json::to_value(AiType::EventBased).unwrap(), "event-based");
    }
}
