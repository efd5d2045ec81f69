//! User profiles

use crate::core::auth::Role;
use crate::core::entity::{Data, Entity};
use crate::core::field::FieldValue;
use crate::payments::model::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Student bookings granted to a new profile
pub const DEFAULT_STUDENT_ALLOWANCE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Km,
    Zh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    pub user_type: Role,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
    pub language: Language,
    pub currency: Currency,
    pub is_student: bool,
    pub student_email: Option<String>,
    pub student_discount_remaining: u32,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    /// Cached `first_name last_name`
    #[serde(default)]
    pub full_name: String,
}

impl User {
    pub fn new(id: Uuid, user_type: Role, email: String, first_name: String, last_name: String) -> Self {
        let now = Utc::now();
        let full_name = format!("{} {}", first_name, last_name);
        Self {
            id,
            entity_type: "user".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            user_type,
            email,
            first_name,
            last_name,
            phone: None,
            profile_image: None,
            language: Language::default(),
            currency: Currency::default(),
            is_student: false,
            student_email: None,
            student_discount_remaining: DEFAULT_STUDENT_ALLOWANCE,
            is_active: true,
            last_login: None,
            full_name,
        }
    }

    /// Whether the next booking gets the student discount
    pub fn has_student_discount(&self) -> bool {
        self.is_student && self.student_discount_remaining > 0
    }

    pub fn refresh_full_name(&mut self) {
        self.full_name = format!("{} {}", self.first_name, self.last_name);
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for User {
    fn resource_name() -> &'static str {
        "users"
    }

    fn resource_name_singular() -> &'static str {
        "user"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn status(&self) -> &str {
        if self.is_active { "active" } else { "inactive" }
    }
}

impl Data for User {
    fn name(&self) -> &str {
        &self.full_name
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["email"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "email" => Some(FieldValue::String(self.email.clone())),
            "user_type" => Some(FieldValue::from(self.user_type.as_str())),
            "is_student" => Some(FieldValue::Boolean(self.is_student)),
            "is_active" => Some(FieldValue::Boolean(self.is_active)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_allowance() {
        let mut user = User::new(
            Uuid::new_v4(),
            Role::Tourist,
            "dara@example.com".to_string(),
            "Dara".to_string(),
            "Sok".to_string(),
        );
        assert!(!user.has_student_discount());
        user.is_student = true;
        assert!(user.has_student_discount());
        user.student_discount_remaining = 0;
        assert!(!user.has_student_discount());
        assert_eq!(user.name(), "Dara Sok");
    }
}
