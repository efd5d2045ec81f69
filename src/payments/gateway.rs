//! Payment gateway seam
//!
//! PayPal, Bakong and Stripe all follow the same three steps: create an
//! intent the guest approves, capture it, and refund captured funds. The
//! platform only talks to gateways through [`PaymentGateway`].

use super::model::{Currency, PaymentMethod};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub booking_id: Uuid,
    pub method: PaymentMethod,
    pub amount: f64,
    pub currency: Currency,
    pub description: String,
}

/// What the guest needs to approve a payment
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub transaction_id: String,
    pub method: PaymentMethod,
    pub amount: f64,
    /// PayPal approval link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
    /// Bakong KHQR payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_payload: Option<String>,
    /// Stripe client secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip)]
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Captured { raw: Value },
    Declined { reason: String, raw: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount: f64,
    pub raw: Value,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent>;

    async fn capture(&self, method: PaymentMethod, transaction_id: &str) -> Result<CaptureOutcome>;

    async fn refund(
        &self,
        method: PaymentMethod,
        transaction_id: &str,
        amount: f64,
    ) -> Result<RefundReceipt>;
}

/// Deterministic in-process gateway
///
/// Intents get sequential ids per gateway. Captures succeed unless the
/// gateway was built with [`SimulatedGateway::declining`]. Refunds may not
/// exceed what was captured.
#[derive(Default)]
pub struct SimulatedGateway {
    sequence: AtomicU64,
    intents: DashMap<String, SimulatedIntent>,
    decline_reason: Option<String>,
}

#[derive(Debug, Clone)]
struct SimulatedIntent {
    amount: f64,
    captured: bool,
    refunded: f64,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that declines every capture with `reason`
    pub fn declining(reason: impl Into<String>) -> Self {
        Self {
            decline_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    fn prefix(method: PaymentMethod) -> &'static str {
        match method {
            PaymentMethod::Paypal => "PAYPAL",
            PaymentMethod::Bakong => "BAKONG",
            PaymentMethod::Stripe => "STRIPE",
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent> {
        if request.amount < 0.01 {
            return Err(anyhow!("amount must be at least 0.01"));
        }

        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let transaction_id = format!("{}-SIM-{:08}", Self::prefix(request.method), n);
        self.intents.insert(
            transaction_id.clone(),
            SimulatedIntent {
                amount: request.amount,
                captured: false,
                refunded: 0.0,
            },
        );

        let mut intent = PaymentIntent {
            transaction_id: transaction_id.clone(),
            method: request.method,
            amount: request.amount,
            approval_url: None,
            qr_payload: None,
            client_secret: None,
            raw: json!({
                "id": transaction_id,
                "status": "CREATED",
                "amount": request.amount,
                "currency": request.currency.as_str(),
            }),
        };
        match request.method {
            PaymentMethod::Paypal => {
                intent.approval_url = Some(format!(
                    "https://sandbox.paypal.test/checkoutnow?token={}",
                    transaction_id
                ))
            }
            PaymentMethod::Bakong => {
                intent.qr_payload = Some(format!(
                    "KHQR|{}|{:.2}|{}",
                    transaction_id,
                    request.amount,
                    request.currency.as_str()
                ))
            }
            PaymentMethod::Stripe => {
                intent.client_secret = Some(format!("{}_secret_sim", transaction_id))
            }
        }
        Ok(intent)
    }

    async fn capture(&self, _method: PaymentMethod, transaction_id: &str) -> Result<CaptureOutcome> {
        let mut intent = self
            .intents
            .get_mut(transaction_id)
            .ok_or_else(|| anyhow!("unknown transaction {}", transaction_id))?;

        if let Some(reason) = &self.decline_reason {
            return Ok(CaptureOutcome::Declined {
                reason: reason.clone(),
                raw: json!({"id": transaction_id, "status": "DECLINED"}),
            });
        }

        intent.captured = true;
        Ok(CaptureOutcome::Captured {
            raw: json!({"id": transaction_id, "status": "COMPLETED", "amount": intent.amount}),
        })
    }

    async fn refund(
        &self,
        _method: PaymentMethod,
        transaction_id: &str,
        amount: f64,
    ) -> Result<RefundReceipt> {
        let mut intent = self
            .intents
            .get_mut(transaction_id)
            .ok_or_else(|| anyhow!("unknown transaction {}", transaction_id))?;

        if !intent.captured {
            return Err(anyhow!("transaction {} was never captured", transaction_id));
        }
        if intent.refunded + amount > intent.amount + 0.005 {
            return Err(anyhow!(
                "refund of {:.2} exceeds the captured {:.2}",
                amount,
                intent.amount - intent.refunded
            ));
        }

        intent.refunded += amount;
        let refund_id = format!("{}-R{}", transaction_id, self.sequence.fetch_add(1, Ordering::SeqCst) + 1);
        Ok(RefundReceipt {
            refund_id: refund_id.clone(),
            amount,
            raw: json!({"id": refund_id, "status": "COMPLETED", "amount": amount}),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn request(method: PaymentMethod, amount: f64) -> IntentRequest {
        IntentRequest {
            booking_id: Uuid::new_v4(),
            method,
            amount,
            currency: Currency::Usd,
            description: "Booking BK-TEST".to_string(),
        }
    }

    #[tokio::test]
    async fn test_intent_capture_refund() {
        let gateway = SimulatedGateway::new();
        let intent = gateway
            .create_intent(&request(PaymentMethod::Paypal, 100.0))
            .await
            .unwrap();
        assert_eq!(intent.transaction_id, "PAYPAL-SIM-00000001");
        assert!(intent.approval_url.is_some());

        let outcome = gateway
            .capture(PaymentMethod::Paypal, &intent.transaction_id)
            .await
            .unwrap();
        assert!(matches!(outcome, CaptureOutcome::Captured { .. }));

        gateway
            .refund(PaymentMethod::Paypal, &intent.transaction_id, 60.0)
            .await
            .unwrap();
        assert!(gateway
            .refund(PaymentMethod::Paypal, &intent.transaction_id, 60.0)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_refund_requires_capture() {
        let gateway = SimulatedGateway::new();
        let intent = assert_ok!(
            gateway
                .create_intent(&request(PaymentMethod::Bakong, 20.0))
                .await
        );
        assert!(intent.qr_payload.unwrap().starts_with("KHQR|BAKONG-SIM-"));
        assert_err!(
            gateway
                .refund(PaymentMethod::Bakong, &intent.transaction_id, 5.0)
                .await
        );
    }

    #[tokio::test]
    async fn test_declining_gateway() {
        let gateway = SimulatedGateway::declining("insufficient funds");
        let intent = gateway
            .create_intent(&request(PaymentMethod::Stripe, 10.0))
            .await
            .unwrap();
        let outcome = gateway
            .capture(PaymentMethod::Stripe, &intent.transaction_id)
            .await
            .unwrap();
        assert!(matches!(outcome, CaptureOutcome::Declined { reason, .. } if reason == "insufficient funds"));
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let gateway = SimulatedGateway::new();
        assert!(gateway.capture(PaymentMethod::Paypal, "nope").await.is_err());
        assert!(gateway
            .create_intent(&request(PaymentMethod::Paypal, 0.0))
            .await
            .is_err());
    }
}
