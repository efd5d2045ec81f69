//! Promo codes and their eligibility rules

use crate::core::entity::{Data, Entity};
use crate::core::error::PromoError;
use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Which users may redeem a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromoAudience {
    #[default]
    All,
    /// Users without a completed booking
    New,
    /// Users with at least one completed booking
    Returning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicableTo {
    #[default]
    All,
    Hotels,
    Tours,
    Events,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    /// Upper-case and unique
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_booking_amount: f64,
    pub max_discount: Option<f64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: u32,
    pub usage_count: u32,
    pub user_type: PromoAudience,
    pub applicable_to: ApplicableTo,
    #[serde(default)]
    pub applicable_ids: Vec<Uuid>,
    pub is_active: bool,
    pub created_by: Uuid,
}

impl PromoCode {
    /// The precise reason the code cannot be redeemed at `now`, if any
    pub fn check_validity(&self, now: DateTime<Utc>) -> Result<(), PromoError> {
        let reason = if !self.is_active || self.deleted_at.is_some() {
            "This promo code is inactive"
        } else if self.valid_from > now {
            "This promo code is not yet valid"
        } else if self.valid_until < now {
            "This promo code has expired"
        } else if self.usage_count >= self.usage_limit {
            "This promo code has reached its usage limit"
        } else {
            return Ok(());
        };
        Err(PromoError::Invalid {
            reason: reason.to_string(),
        })
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.check_validity(now).is_ok()
    }

    /// Whether the code covers an item of `item_type` with id `item_id`
    pub fn can_apply_to(&self, item_type: ApplicableTo, item_id: Uuid) -> bool {
        match self.applicable_to {
            ApplicableTo::All => true,
            scope if scope == item_type => {
                self.applicable_ids.is_empty() || self.applicable_ids.contains(&item_id)
            }
            _ => false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for PromoCode {
    fn resource_name() -> &'static str {
        "promo_codes"
    }

    fn resource_name_singular() -> &'static str {
        "promo_code"
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

impl Data for PromoCode {
    fn name(&self) -> &str {
        &self.code
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["code"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "code" => Some(FieldValue::String(self.code.clone())),
            "is_active" => Some(FieldValue::Boolean(self.is_active)),
            "discount_value" => Some(FieldValue::Float(self.discount_value)),
            "usage_count" => Some(FieldValue::Integer(self.usage_count as i64)),
            "valid_until" => Some(FieldValue::DateTime(self.valid_until)),
            "created_by" => Some(FieldValue::Uuid(self.created_by)),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Duration;

    pub fn promo(code: &str, discount_type: DiscountType, value: f64) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            id: Uuid::new_v4(),
            entity_type: "promo_code".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            code: code.to_string(),
            description: format!("{} off", value),
            discount_type,
            discount_value: value,
            min_booking_amount: 0.0,
            max_discount: None,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            usage_limit: 100,
            usage_count: 0,
            user_type: PromoAudience::All,
            applicable_to: ApplicableTo::All,
            applicable_ids: Vec::new(),
            is_active: true,
            created_by: Uuid::new_v4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::promo;
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validity_reasons() {
        let now = Utc::now();
        let mut p = promo("SUMMER", DiscountType::Percentage, 10.0);
        assert!(p.is_valid(now));

        p.usage_count = p.usage_limit;
        assert!(p.check_validity(now).unwrap_err().to_string().contains("usage limit"));

        p.usage_count = 0;
        p.valid_until = now - Duration::hours(1);
        assert!(p.check_validity(now).unwrap_err().to_string().contains("expired"));

        p.valid_from = now + Duration::days(1);
        assert!(p.check_validity(now).unwrap_err().to_string().contains("not yet valid"));

        p.is_active = false;
        assert!(p.check_validity(now).unwrap_err().to_string().contains("inactive"));
    }

    #[test]
    fn test_applicability() {
        let hotel = Uuid::new_v4();
        let mut p = promo("HOTELS", DiscountType::Fixed, 5.0);
        assert!(p.can_apply_to(ApplicableTo::Hotels, hotel));

        p.applicable_to = ApplicableTo::Tours;
        assert!(!p.can_apply_to(ApplicableTo::Hotels, hotel));

        p.applicable_to = ApplicableTo::Hotels;
        p.applicable_ids = vec![Uuid::new_v4()];
        assert!(!p.can_apply_to(ApplicableTo::Hotels, hotel));
        p.applicable_ids.push(hotel);
        assert!(p.can_apply_to(ApplicableTo::Hotels, hotel));
    }
}
