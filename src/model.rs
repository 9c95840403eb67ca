//! Data models for the coupon service
//!
//! This module defines the coupon document stored in the database, the
//! redemption log entries appended to it, and the request/response shapes
//! of the HTTP API. All wire names are camelCase.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// How a coupon turns an order value into a discount
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Proportional to the order value, optionally capped by `max_discount`
    Percentage,
    /// Flat amount, never more than the order value
    Fixed,
}

/// Optional audience restrictions of a coupon
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRestrictions {
    /// Allow-list of user ids. Empty means every user may see the coupon.
    #[serde(default)]
    pub specific_users: Vec<String>,
}

/// One successful application of a coupon to an order
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
    pub user: String,
    pub used_at: DateTime<Utc>,
    pub order_value: f64,
    /// The discount actually granted, not the coupon's nominal value
    pub discount_applied: f64,
}

/// A coupon document as stored in the database
///
/// `usage_count` always equals `used_by.len()`; both are only changed
/// together inside a single store update.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Generated identifier, also the primary key in the coupons table
    pub id: String,

    /// Redemption code, stored upper-cased
    pub code: String,

    pub title: String,

    pub discount_type: DiscountType,

    pub discount_value: f64,

    /// Upper bound on the discount of a percentage coupon
    #[serde(default)]
    pub max_discount: Option<f64>,

    #[serde(default)]
    pub min_order_value: f64,

    pub valid_from: DateTime<Utc>,

    pub valid_until: DateTime<Utc>,

    /// Global cap on redemptions, `None` means unlimited
    #[serde(default)]
    pub usage_limit: Option<u64>,

    #[serde(default)]
    pub usage_count: u64,

    #[serde(default = "default_user_usage_limit")]
    pub user_usage_limit: u64,

    /// Accepted payment methods, empty means no restriction
    #[serde(default)]
    pub payment_methods: Vec<String>,

    #[serde(default)]
    pub user_restrictions: UserRestrictions,

    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Listing order hint, higher first
    #[serde(default)]
    pub priority: i64,

    #[serde(default)]
    pub used_by: Vec<RedemptionRecord>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Builds a fresh coupon from an administrative payload
    pub fn from_input(id: String, input: CouponInput, now: DateTime<Utc>) -> Self {
        let mut coupon = Coupon {
            id,
            code: String::new(),
            title: String::new(),
            discount_type: input.discount_type,
            discount_value: 0.0,
            max_discount: None,
            min_order_value: 0.0,
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            usage_limit: None,
            usage_count: 0,
            user_usage_limit: default_user_usage_limit(),
            payment_methods: Vec::new(),
            user_restrictions: UserRestrictions::default(),
            is_active: true,
            priority: 0,
            used_by: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        coupon.replace_fields(input, now);
        coupon
    }

    /// Overwrites every administrator-editable field
    ///
    /// Identity, creation time and the redemption log are left alone.
    pub fn replace_fields(&mut self, input: CouponInput, now: DateTime<Utc>) {
        self.code = normalize_code(&input.code);
        self.title = input.title;
        self.discount_type = input.discount_type;
        self.discount_value = input.discount_value;
        self.max_discount = input.max_discount;
        self.min_order_value = input.min_order_value;
        self.valid_from = input.valid_from;
        self.valid_until = input.valid_until;
        self.usage_limit = input.usage_limit;
        self.user_usage_limit = input.user_usage_limit;
        self.payment_methods = input.payment_methods;
        self.user_restrictions = input.user_restrictions;
        self.is_active = input.is_active;
        self.priority = input.priority;
        self.updated_at = now;
    }

    /// True when `now` lies inside the inclusive validity window
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }

    /// True once the global usage cap has been reached
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
    }

    /// Active, inside its window and below its global cap
    pub fn is_currently_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.is_within_window(now) && !self.is_exhausted()
    }

    /// Number of redemptions logged for `user_id`
    pub fn usage_by(&self, user_id: &str) -> u64 {
        self.used_by
            .iter()
            .filter(|record| record.user == user_id)
            .count() as u64
    }

    /// Whether the allow-list (if any) admits `user_id`
    pub fn admits(&self, user_id: &str) -> bool {
        let allowed = &self.user_restrictions.specific_users;
        allowed.is_empty() || allowed.iter().any(|user| user == user_id)
    }
}

/// Canonical form of a coupon code, used for storage and lookup
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn default_user_usage_limit() -> u64 {
    1
}

fn default_active() -> bool {
    true
}

/// Administrative payload used by both create and update
///
/// # Example
/// ```json
/// {
///   "code": "SAVE10",
///   "title": "10% off",
///   "discountType": "percentage",
///   "discountValue": 10,
///   "maxDiscount": 500,
///   "minOrderValue": 1000,
///   "validFrom": "2026-01-01T00:00:00Z",
///   "validUntil": "2026-12-31T23:59:59Z"
/// }
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_coupon_input"))]
pub struct CouponInput {
    #[validate(length(min = 1, message = "code must not be empty"))]
    pub code: String,

    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,

    pub discount_type: DiscountType,

    #[validate(range(min = 0.0, message = "discountValue must not be negative"))]
    pub discount_value: f64,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "maxDiscount must not be negative"))]
    pub max_discount: Option<f64>,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "minOrderValue must not be negative"))]
    pub min_order_value: f64,

    pub valid_from: DateTime<Utc>,

    pub valid_until: DateTime<Utc>,

    #[serde(default)]
    pub usage_limit: Option<u64>,

    #[serde(default = "default_user_usage_limit")]
    #[validate(range(min = 1, message = "userUsageLimit must be at least 1"))]
    pub user_usage_limit: u64,

    #[serde(default)]
    pub payment_methods: Vec<String>,

    #[serde(default)]
    pub user_restrictions: UserRestrictions,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default)]
    pub priority: i64,
}

fn check_coupon_input(input: &CouponInput) -> Result<(), ValidationError> {
    if input.code.trim().is_empty() {
        return Err(ValidationError::new("blank_code")
            .with_message(Cow::Borrowed("code must not be blank")));
    }
    if input.valid_from > input.valid_until {
        return Err(ValidationError::new("validity_window")
            .with_message(Cow::Borrowed("validFrom must not be after validUntil")));
    }
    if input.discount_type == DiscountType::Percentage && input.discount_value > 100.0 {
        return Err(ValidationError::new("percentage")
            .with_message(Cow::Borrowed("percentage discountValue must not exceed 100")));
    }
    Ok(())
}

/// Request payload for previewing a coupon against an order
///
/// # Example
/// ```json
/// {
///   "code": "SAVE10",
///   "orderValue": 2000,
///   "products": [],
///   "paymentMethod": "card"
/// }
/// ```
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub code: String,
    pub order_value: f64,

    /// Cart contents as sent by the storefront; not used by any rule yet
    #[serde(default)]
    pub products: Vec<serde_json::Value>,

    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Request payload for recording a redemption at order placement
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub code: String,
    pub order_value: f64,
    pub discount_applied: f64,
}

/// The subset of a coupon echoed back by a successful validation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponSummary {
    pub id: String,
    pub code: String,
    pub title: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
}

impl From<&Coupon> for CouponSummary {
    fn from(coupon: &Coupon) -> Self {
        CouponSummary {
            id: coupon.id.clone(),
            code: coupon.code.clone(),
            title: coupon.title.clone(),
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
        }
    }
}

/// Successful outcome of a validation
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSuccess {
    pub coupon: CouponSummary,
    pub discount_amount: f64,
    pub final_amount: f64,
}

/// Aggregates over a coupon's redemption log
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponAnalytics {
    pub total_usage: u64,
    pub total_discount: f64,
    pub total_order_value: f64,
    pub average_order_value: f64,

    /// Redemptions per UTC day, keyed `YYYY-MM-DD`
    pub usage_by_day: BTreeMap<String, u64>,
}

/// Response of the analytics endpoint
#[derive(Serialize, Debug, Clone)]
pub struct AnalyticsResponse {
    pub coupon: Coupon,
    pub analytics: CouponAnalytics,
}
