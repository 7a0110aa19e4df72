//! Order data handed to the checkout by the page, and the knobs the host can turn.
//!
//! The server renders a `paymentData` record into the page:
//!
//! ```js
//! window.paymentData = {
//!     razorpay_key: "rzp_test_…",
//!     amount: 49900,          // paise
//!     order_id: "order_…",
//!     user_name: "…",
//!     user_email: "…",
//!     csrf_token: "…",
//!     pay_amount: "499",      // shown on the button
//! };
//! ```
//!
//! [`OrderPaymentContext`] is the validated form of that record. Construction
//! fails up front when a required field is missing, instead of at widget-open time.

use std::time::Duration;

use gloo_utils::format::JsValueSerdeExt;
use serde::{Deserialize, Deserializer};
use wasm_bindgen::JsValue;
use web_sys::js_sys::Reflect;

use crate::error::CheckoutError;

/// Razorpay only ever receives rupees from this checkout.
pub const CURRENCY: &str = "INR";

/// Name of the global the page stores its payment data under.
pub const PAGE_DATA_GLOBAL: &str = "paymentData";

/// Validated, read-only order data for a single page view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderPaymentContext {
    /// Razorpay key id (`rzp_live_…` / `rzp_test_…`).
    pub gateway_key: String,
    /// Amount in paise; must match what the server authorized for `order_id`.
    pub amount_minor_units: u64,
    /// Razorpay order id.
    pub order_id: String,
    pub user_name: String,
    pub user_email: String,
    /// Anti-forgery token sent back on the verification POST.
    pub csrf_token: String,
    /// Human-readable amount for the pay button label.
    pub display_amount: String,
}

/// The record exactly as the page provides it; every field optional.
#[derive(Deserialize, Debug, Default)]
struct RawPaymentData {
    razorpay_key: Option<String>,
    amount: Option<u64>,
    order_id: Option<String>,
    user_name: Option<String>,
    user_email: Option<String>,
    csrf_token: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pay_amount: Option<String>,
}

impl OrderPaymentContext {
    pub fn currency(&self) -> &'static str {
        CURRENCY
    }

    /// Read and validate `window.paymentData`.
    pub fn from_window() -> Result<Self, CheckoutError> {
        let window = web_sys::window()
            .ok_or_else(|| CheckoutError::InvalidPageData("no window".into()))?;
        let value = Reflect::get(&window, &JsValue::from_str(PAGE_DATA_GLOBAL))
            .map_err(CheckoutError::from_js)?;
        if value.is_undefined() || value.is_null() {
            return Err(CheckoutError::InvalidPageData(format!(
                "window.{PAGE_DATA_GLOBAL} is not set"
            )));
        }
        let raw: RawPaymentData = value
            .into_serde()
            .map_err(|e| CheckoutError::InvalidPageData(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parse and validate the page record from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, CheckoutError> {
        let raw: RawPaymentData = serde_json::from_str(json)
            .map_err(|e| CheckoutError::InvalidPageData(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawPaymentData) -> Result<Self, CheckoutError> {
        let amount_minor_units = raw.amount.ok_or(CheckoutError::MissingField("amount"))?;
        if amount_minor_units == 0 {
            return Err(CheckoutError::InvalidPageData(
                "amount must be greater than zero".into(),
            ));
        }
        Ok(Self {
            gateway_key: required(raw.razorpay_key, "razorpay_key")?,
            amount_minor_units,
            order_id: required(raw.order_id, "order_id")?,
            user_name: raw.user_name.unwrap_or_default(),
            user_email: raw.user_email.unwrap_or_default(),
            csrf_token: required(raw.csrf_token, "csrf_token")?,
            display_amount: required(raw.pay_amount, "pay_amount")?,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, CheckoutError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CheckoutError::MissingField(field)),
    }
}

// Templates render `pay_amount` either quoted or bare.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Branding, routes and the verification deadline.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Shown as the merchant name in the widget header.
    pub merchant_name: String,
    pub description: String,
    /// Widget accent color.
    pub theme_color: String,
    /// Where the payment result is posted for signature verification.
    pub verify_endpoint: String,
    /// Where the page goes once the server accepts the payment.
    pub success_redirect: String,
    /// Upper bound on the verification round-trip. Serialized as seconds.
    #[serde(rename = "verification_timeout_secs", deserialize_with = "duration_secs")]
    pub verification_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            merchant_name: "PetalCart 🌸".to_string(),
            description: "Thank you for your flower order!".to_string(),
            theme_color: "#d88195".to_string(),
            verify_endpoint: "/payment-success/".to_string(),
            success_redirect: "/order_history/".to_string(),
            verification_timeout: Duration::from_secs(30),
        }
    }
}

fn duration_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
