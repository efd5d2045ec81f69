//! Payment plans offered for a stay and the installments they imply

use super::model::PaymentType;
use crate::booking::model::PaymentPlan;
use crate::booking::pricing::{deposit_split, full_payment_discount, milestone_split, round_cents};
use crate::config::PricingConfig;
use crate::core::error::DerlgResult;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

pub const FULL_PAYMENT_BONUS_SERVICES: [&str; 3] = [
    "Free airport pickup",
    "Priority check-in",
    "Complimentary welcome drink",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledPayment {
    pub installment: u8,
    pub payment_type: PaymentType,
    pub percentage: f64,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentOption {
    pub plan: PaymentPlan,
    pub original_total: f64,
    pub discount_amount: f64,
    pub final_total: f64,
    pub amount_due_now: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_balance: Option<f64>,
    pub schedule: Vec<ScheduledPayment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bonus_services: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentOptions {
    pub deposit: PaymentOption,
    pub milestone: PaymentOption,
    pub full: PaymentOption,
}

/// Installments of a plan for a `total` that already reflects the plan
///
/// The deposit balance is due at check-in. The second milestone is due
/// `milestone_2_lead_days` before check-in (never before `booked_on`), the
/// third at check-in.
pub fn installments(
    plan: PaymentPlan,
    total: f64,
    deposit_percentage: f64,
    check_in: NaiveDate,
    booked_on: NaiveDate,
    rules: &PricingConfig,
) -> DerlgResult<Vec<ScheduledPayment>> {
    let schedule = match plan {
        PaymentPlan::Full => vec![ScheduledPayment {
            installment: 1,
            payment_type: PaymentType::Full,
            percentage: 100.0,
            amount: round_cents(total),
            due_date: booked_on,
            description: "Full payment".to_string(),
        }],
        PaymentPlan::Deposit => {
            let (deposit, remaining) = deposit_split(total, deposit_percentage, rules)?;
            vec![
                ScheduledPayment {
                    installment: 1,
                    payment_type: PaymentType::Deposit,
                    percentage: deposit_percentage,
                    amount: deposit,
                    due_date: booked_on,
                    description: "Initial deposit payment".to_string(),
                },
                ScheduledPayment {
                    installment: 2,
                    payment_type: PaymentType::Full,
                    percentage: 100.0 - deposit_percentage,
                    amount: remaining,
                    due_date: check_in.max(booked_on),
                    description: "Remaining balance due at check-in".to_string(),
                },
            ]
        }
        PaymentPlan::Milestone => {
            let [m1, m2, m3] = milestone_split(total);
            let second_due = (check_in - Duration::days(rules.milestone_2_lead_days)).max(booked_on);
            vec![
                ScheduledPayment {
                    installment: 1,
                    payment_type: PaymentType::Milestone1,
                    percentage: 50.0,
                    amount: m1,
                    due_date: booked_on,
                    description: "50% upfront payment".to_string(),
                },
                ScheduledPayment {
                    installment: 2,
                    payment_type: PaymentType::Milestone2,
                    percentage: 25.0,
                    amount: m2,
                    due_date: second_due,
                    description: "25% payment one week before check-in".to_string(),
                },
                ScheduledPayment {
                    installment: 3,
                    payment_type: PaymentType::Milestone3,
                    percentage: 25.0,
                    amount: m3,
                    due_date: check_in.max(booked_on),
                    description: "25% payment upon arrival".to_string(),
                },
            ]
        }
    };
    Ok(schedule)
}

/// All three plans for a stay whose pre-discount total is `total`
pub fn payment_options(
    total: f64,
    deposit_percentage: f64,
    check_in: NaiveDate,
    today: NaiveDate,
    rules: &PricingConfig,
) -> DerlgResult<PaymentOptions> {
    let total = round_cents(total);

    let deposit_schedule = installments(
        PaymentPlan::Deposit,
        total,
        deposit_percentage,
        check_in,
        today,
        rules,
    )?;
    let deposit = PaymentOption {
        plan: PaymentPlan::Deposit,
        original_total: total,
        discount_amount: 0.0,
        final_total: total,
        amount_due_now: deposit_schedule[0].amount,
        deposit_amount: Some(deposit_schedule[0].amount),
        remaining_balance: Some(deposit_schedule[1].amount),
        schedule: deposit_schedule,
        bonus_services: Vec::new(),
    };

    let milestone_schedule =
        installments(PaymentPlan::Milestone, total, 0.0, check_in, today, rules)?;
    let milestone = PaymentOption {
        plan: PaymentPlan::Milestone,
        original_total: total,
        discount_amount: 0.0,
        final_total: total,
        amount_due_now: milestone_schedule[0].amount,
        deposit_amount: None,
        remaining_balance: None,
        schedule: milestone_schedule,
        bonus_services: Vec::new(),
    };

    let (discount, final_total) = full_payment_discount(total, rules.full_payment_discount);
    let full = PaymentOption {
        plan: PaymentPlan::Full,
        original_total: total,
        discount_amount: discount,
        final_total,
        amount_due_now: final_total,
        deposit_amount: None,
        remaining_balance: None,
        schedule: installments(PaymentPlan::Full, final_total, 0.0, check_in, today, rules)?,
        bonus_services: FULL_PAYMENT_BONUS_SERVICES.iter().map(|s| s.to_string()).collect(),
    };

    Ok(PaymentOptions {
        deposit,
        milestone,
        full,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_milestone_due_dates() {
        let rules = PricingConfig::default();
        let schedule = installments(
            PaymentPlan::Milestone,
            400.0,
            0.0,
            date(2026, 12, 20),
            date(2026, 11, 1),
            &rules,
        )
        .unwrap();

        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[1].due_date, date(2026, 12, 13));
        assert_eq!(schedule[2].due_date, date(2026, 12, 20));
        let amounts: Vec<f64> = schedule.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![200.0, 100.0, 100.0]);
    }

    #[test]
    fn test_second_milestone_never_before_booking_date() {
        let rules = PricingConfig::default();
        let schedule = installments(
            PaymentPlan::Milestone,
            100.0,
            0.0,
            date(2026, 11, 3),
            date(2026, 11, 1),
            &rules,
        )
        .unwrap();
        assert_eq!(schedule[1].due_date, date(2026, 11, 1));
    }

    #[test]
    fn test_all_options() {
        let rules = PricingConfig::default();
        let options = payment_options(330.0, 50.0, date(2026, 12, 20), date(2026, 11, 1), &rules).unwrap();

        assert_eq!(options.deposit.amount_due_now, 165.0);
        assert_eq!(options.deposit.remaining_balance, Some(165.0));
        assert_eq!(options.deposit.schedule[1].payment_type, PaymentType::Full);

        assert_eq!(options.milestone.amount_due_now, 165.0);

        assert_eq!(options.full.discount_amount, 16.5);
        assert_eq!(options.full.final_total, 313.5);
        assert_eq!(options.full.bonus_services.len(), 3);
    }

    #[test]
    fn test_deposit_percentage_out_of_range() {
        let rules = PricingConfig::default();
        assert!(payment_options(100.0, 80.0, date(2026, 12, 20), date(2026, 11, 1), &rules).is_err());
    }
}
