//! Coupon validation and redemption engine
//!
//! This module implements the coupon rules:
//! - Listing currently valid coupons, globally and per user
//! - Validating a coupon against a proposed order (read-only preview)
//! - Recording a redemption once the order is placed
//! - Aggregating a coupon's redemption log
//! - Administrative create and replace-all-fields update
//!
//! Every operation takes `now` explicitly so the rules never read the clock
//! themselves.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use validator::Validate;

use crate::error::{Error, Rejection, Result};
use crate::model::{
    normalize_code, Coupon, CouponAnalytics, CouponInput, CouponSummary, DiscountType,
    RedemptionRecord, ValidationSuccess,
};
use crate::store::CouponStore;

const COUPON_ID_LEN: usize = 12;

/// Outcome of [`CouponService::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(ValidationSuccess),
    Invalid(Rejection),
}

/// Discount granted by `coupon` on an order of `order_value`
///
/// Never exceeds the order value, and for capped percentage coupons never
/// exceeds `max_discount`.
pub fn compute_discount(coupon: &Coupon, order_value: f64) -> f64 {
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let proportional = order_value * coupon.discount_value / 100.0;
            match coupon.max_discount {
                Some(cap) => proportional.min(cap),
                None => proportional,
            }
        }
        DiscountType::Fixed => coupon.discount_value,
    };
    raw.min(order_value)
}

/// Runs the rule checks on an already-found active coupon, in order
pub fn evaluate(
    coupon: &Coupon,
    order_value: f64,
    user_id: &str,
    payment_method: Option<&str>,
    now: DateTime<Utc>,
) -> Validation {
    if !coupon.is_within_window(now) {
        return Validation::Invalid(Rejection::OutsideWindow);
    }

    if coupon.is_exhausted() {
        return Validation::Invalid(Rejection::UsageLimitExceeded);
    }

    if order_value < coupon.min_order_value {
        return Validation::Invalid(Rejection::BelowMinimumOrder {
            min_order_value: coupon.min_order_value,
        });
    }

    if coupon.usage_by(user_id) >= coupon.user_usage_limit {
        return Validation::Invalid(Rejection::AlreadyUsed);
    }

    if let Some(method) = payment_method {
        if !coupon.payment_methods.is_empty()
            && !coupon.payment_methods.iter().any(|allowed| allowed == method)
        {
            return Validation::Invalid(Rejection::PaymentMethodNotAllowed {
                allowed: coupon.payment_methods.clone(),
            });
        }
    }

    let discount_amount = compute_discount(coupon, order_value);
    Validation::Valid(ValidationSuccess {
        coupon: CouponSummary::from(coupon),
        discount_amount,
        final_amount: order_value - discount_amount,
    })
}

/// Aggregates a coupon's redemption log
pub fn summarize(coupon: &Coupon) -> CouponAnalytics {
    let total_discount: f64 = coupon
        .used_by
        .iter()
        .map(|record| record.discount_applied)
        .sum();
    let total_order_value: f64 = coupon.used_by.iter().map(|record| record.order_value).sum();
    let average_order_value = if coupon.used_by.is_empty() {
        0.0
    } else {
        total_order_value / coupon.used_by.len() as f64
    };

    let mut usage_by_day = BTreeMap::new();
    for record in &coupon.used_by {
        *usage_by_day
            .entry(record.used_at.date_naive().to_string())
            .or_insert(0) += 1;
    }

    CouponAnalytics {
        total_usage: coupon.usage_count,
        total_discount,
        total_order_value,
        average_order_value,
        usage_by_day,
    }
}

fn by_listing_order(coupons: &mut [Coupon]) {
    coupons.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

fn generate_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(COUPON_ID_LEN)
        .map(char::from)
        .collect()
}

/// Coupon engine over a shared [`CouponStore`]
#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn CouponStore>,
}

impl CouponService {
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        CouponService { store }
    }

    /// Currently valid coupons, highest priority first, newest first among equals
    pub fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Coupon>> {
        let mut coupons = self.store.find_active(now)?;
        by_listing_order(&mut coupons);
        Ok(coupons)
    }

    /// Previews `code` against an order without touching the store
    pub fn validate(
        &self,
        code: &str,
        order_value: f64,
        user_id: &str,
        payment_method: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Validation> {
        let coupon = match self.find_active_by_code(code)? {
            Some(coupon) => coupon,
            None => return Ok(Validation::Invalid(Rejection::InvalidCode)),
        };

        let outcome = evaluate(&coupon, order_value, user_id, payment_method, now);
        if let Validation::Invalid(reason) = &outcome {
            tracing::debug!(code = %coupon.code, user = %user_id, %reason, "coupon rejected");
        }
        Ok(outcome)
    }

    /// Records a redemption of `code` by `user_id`
    ///
    /// The caller is expected to have validated the order first; only the
    /// active flag, the code and the global usage cap are re-checked, inside
    /// the same atomic update that appends the record.
    pub fn apply(
        &self,
        code: &str,
        user_id: &str,
        order_value: f64,
        discount_applied: f64,
        now: DateTime<Utc>,
    ) -> Result<Coupon> {
        let coupon = self.find_active_by_code(code)?.ok_or(Error::NotFound)?;
        let code = normalize_code(code);

        let record = RedemptionRecord {
            user: user_id.to_string(),
            used_at: now,
            order_value,
            discount_applied,
        };
        let mut redeem = |current: &mut Coupon| -> Result<()> {
            // Deactivated or re-coded since the lookup
            if !current.is_active || current.code != code {
                return Err(Error::NotFound);
            }
            if current.is_exhausted() {
                return Err(Error::Rejected(Rejection::UsageLimitExceeded));
            }
            current.used_by.push(record.clone());
            current.usage_count += 1;
            current.updated_at = now;
            Ok(())
        };

        let updated = self
            .store
            .update_atomic(&coupon.id, &mut redeem)?
            .ok_or(Error::NotFound)?;

        tracing::info!(
            code = %updated.code,
            user = %user_id,
            order_value,
            discount_applied,
            usage_count = updated.usage_count,
            "coupon applied"
        );
        Ok(updated)
    }

    /// Currently valid coupons that `user_id` may still redeem
    pub fn list_available_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<Coupon>> {
        let mut coupons: Vec<Coupon> = self
            .store
            .find_active(now)?
            .into_iter()
            .filter(|coupon| coupon.usage_by(user_id) < coupon.user_usage_limit)
            .filter(|coupon| coupon.admits(user_id))
            .collect();
        by_listing_order(&mut coupons);
        Ok(coupons)
    }

    /// The coupon together with aggregates over its redemption log
    pub fn analytics(&self, id: &str) -> Result<(Coupon, CouponAnalytics)> {
        let coupon = self.store.find_by_id(id)?.ok_or(Error::NotFound)?;
        let analytics = summarize(&coupon);
        Ok((coupon, analytics))
    }

    pub fn create(&self, input: CouponInput, now: DateTime<Utc>) -> Result<Coupon> {
        input.validate()?;

        let coupon = Coupon::from_input(generate_id(), input, now);
        self.store.insert(&coupon)?;

        tracing::info!(id = %coupon.id, code = %coupon.code, "coupon created");
        Ok(coupon)
    }

    /// Replaces every editable field; the redemption log is preserved
    pub fn update(&self, id: &str, input: CouponInput, now: DateTime<Utc>) -> Result<Coupon> {
        input.validate()?;

        let mut pending = Some(input);
        let mut replace = |current: &mut Coupon| -> Result<()> {
            if let Some(input) = pending.take() {
                current.replace_fields(input, now);
            }
            Ok(())
        };

        let updated = self
            .store
            .update_atomic(id, &mut replace)?
            .ok_or(Error::NotFound)?;

        tracing::info!(id = %updated.id, code = %updated.code, "coupon updated");
        Ok(updated)
    }

    fn find_active_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        Ok(self
            .store
            .find_by_code(code)?
            .filter(|coupon| coupon.is_active))
    }
}
