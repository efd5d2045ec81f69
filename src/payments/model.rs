//! Payment transaction records and their status enums

use crate::booking::pricing::round_cents;
use crate::core::entity::{Data, Entity};
use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Payment gateways a booking can be paid through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Paypal,
    Bakong,
    Stripe,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Bakong => "bakong",
            PaymentMethod::Stripe => "stripe",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "KHR")]
    Khr,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Khr => "KHR",
        }
    }
}

/// Which installment a transaction pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Deposit,
    #[serde(rename = "milestone_1")]
    Milestone1,
    #[serde(rename = "milestone_2")]
    Milestone2,
    #[serde(rename = "milestone_3")]
    Milestone3,
    Full,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::Milestone1 => "milestone_1",
            PaymentType::Milestone2 => "milestone_2",
            PaymentType::Milestone3 => "milestone_3",
            PaymentType::Full => "full",
        }
    }

    /// Milestone number (1..=3) for milestone installments
    pub fn milestone(&self) -> Option<u8> {
        match self {
            PaymentType::Milestone1 => Some(1),
            PaymentType::Milestone2 => Some(2),
            PaymentType::Milestone3 => Some(3),
            _ => None,
        }
    }

    pub fn from_milestone(n: u8) -> Option<Self> {
        match n {
            1 => Some(PaymentType::Milestone1),
            2 => Some(PaymentType::Milestone2),
            3 => Some(PaymentType::Milestone3),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether captured funds are still held by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    #[default]
    Held,
    Released,
    Refunded,
}

impl EscrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowStatus::Held => "held",
            EscrowStatus::Released => "released",
            EscrowStatus::Refunded => "refunded",
        }
    }
}

/// One installment payment against a booking
///
/// A partial refund keeps the transaction `completed` and accumulates in
/// `refund_amount`; it turns `refunded` once nothing of it is left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub hotel_id: Uuid,
    /// Gateway reference, unique across transactions
    pub transaction_id: String,
    pub gateway: PaymentMethod,
    pub amount: f64,
    pub currency: Currency,
    pub payment_type: PaymentType,
    pub status: TransactionStatus,
    pub escrow_status: EscrowStatus,
    pub escrow_release_date: Option<DateTime<Utc>>,
    pub refund_amount: Option<f64>,
    pub refund_reason: Option<String>,
    #[serde(default)]
    pub gateway_response: serde_json::Value,
}

impl PaymentTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        transaction_id: String,
        gateway: PaymentMethod,
        amount: f64,
        payment_type: PaymentType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entity_type: "payment_transaction".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            booking_id,
            user_id,
            hotel_id,
            transaction_id,
            gateway,
            amount,
            currency: Currency::Usd,
            payment_type,
            status: TransactionStatus::Pending,
            escrow_status: EscrowStatus::Held,
            escrow_release_date: None,
            refund_amount: None,
            refund_reason: None,
            gateway_response: serde_json::Value::Null,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_escrow_held(&self) -> bool {
        self.escrow_status == EscrowStatus::Held
    }

    pub fn refunded(&self) -> f64 {
        self.refund_amount.unwrap_or(0.0)
    }

    /// Captured amount not given back to the guest
    pub fn net_amount(&self) -> f64 {
        match self.status {
            TransactionStatus::Completed => round_cents((self.amount - self.refunded()).max(0.0)),
            _ => 0.0,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Copy for tourists: the raw gateway payload is reduced to its status
    pub fn to_safe_view(&self) -> Self {
        let mut view = self.clone();
        view.gateway_response = match self.gateway_response.get("status") {
            Some(status) => serde_json::json!({ "status": status }),
            None => serde_json::Value::Null,
        };
        view
    }
}

impl Entity for PaymentTransaction {
    fn resource_name() -> &'static str {
        "payment_transactions"
    }

    fn resource_name_singular() -> &'static str {
        "payment_transaction"
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
        self.status.as_str()
    }

    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.hotel_id)
    }
}

impl Data for PaymentTransaction {
    fn name(&self) -> &str {
        &self.transaction_id
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["booking_id", "transaction_id"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "booking_id" => Some(FieldValue::Uuid(self.booking_id)),
            "user_id" => Some(FieldValue::Uuid(self.user_id)),
            "hotel_id" => Some(FieldValue::Uuid(self.hotel_id)),
            "transaction_id" => Some(FieldValue::String(self.transaction_id.clone())),
            "gateway" => Some(FieldValue::from(self.gateway.as_str())),
            "amount" => Some(FieldValue::Float(self.amount)),
            "payment_type" => Some(FieldValue::from(self.payment_type.as_str())),
            "status" => Some(FieldValue::from(self.status.as_str())),
            "escrow_status" => Some(FieldValue::from(self.escrow_status.as_str())),
            "created_at" => Some(FieldValue::DateTime(self.created_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(PaymentType::Milestone2).unwrap(),
            "milestone_2"
        );
        assert_eq!(serde_json::to_value(Currency::Khr).unwrap(), "KHR");
        assert_eq!(PaymentType::from_milestone(3), Some(PaymentType::Milestone3));
        assert_eq!(PaymentType::Deposit.milestone(), None);
    }

    #[test]
    fn test_safe_view_hides_gateway_payload() {
        let mut tx = PaymentTransaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "SIM-1".to_string(),
            PaymentMethod::Stripe,
            50.0,
            PaymentType::Deposit,
        );
        tx.gateway_response = serde_json::json!({"status": "COMPLETED", "payer": "secret"});
        let view = tx.to_safe_view();
        assert_eq!(view.gateway_response, serde_json::json!({"status": "COMPLETED"}));
    }

    #[test]
    fn test_net_amount_after_partial_refund() {
        let mut tx = PaymentTransaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "SIM-2".to_string(),
            PaymentMethod::Paypal,
            120.0,
            PaymentType::Deposit,
        );
        assert_eq!(tx.net_amount(), 0.0);

        tx.status = TransactionStatus::Completed;
        tx.refund_amount = Some(20.0);
        assert_eq!(tx.net_amount(), 100.0);

        tx.status = TransactionStatus::Refunded;
        assert_eq!(tx.net_amount(), 0.0);
    }
}
