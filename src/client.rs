//! yew_razorpay/src/client.rs
//!
//! High-level Rust API over Razorpay Checkout.
//!
//! This module provides:
//! - `CheckoutOptions` (with `Prefill` and `Theme`) describing the widget configuration.
//! - `PaymentResult`, the gateway-signed triple the widget hands back on success.
//! - `create_checkout()` to attach the success and dismissal callbacks and construct the widget.
//! - `CheckoutWidget`, the live handle that keeps those callbacks alive and opens the modal.
//!
//! # Example Usage
//! ```rust,ignore
//! use yew_razorpay::{create_checkout, CheckoutConfig, CheckoutOptions, OrderPaymentContext};
//!
//! let context = OrderPaymentContext::from_window()?;
//! let options = CheckoutOptions::new(&context, &CheckoutConfig::default(), Some("9999999999"));
//! let widget = create_checkout(
//!     &options,
//!     |result| match result {
//!         Ok(paid) => tracing::info!(payment_id = %paid.razorpay_payment_id, "paid"),
//!         Err(err) => tracing::error!(%err, "unreadable widget response"),
//!     },
//!     || tracing::info!("Payment window closed"),
//! )?;
//! widget.open()?;
//! ```

use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use tracing::warn;
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use web_sys::js_sys::{Object, Reflect};

use crate::{
    bindings::JsRazorpay,
    context::{CheckoutConfig, OrderPaymentContext},
    error::CheckoutError,
};

/// Configuration for `new Razorpay({ ... })`, minus the JS callbacks.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CheckoutOptions {
    /// Razorpay key id.
    pub key: String,
    /// Amount in paise.
    pub amount: u64,
    pub currency: String,
    /// Merchant name shown in the modal header.
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub theme: Theme,
    pub prefill: Prefill,
}

/// Fields the widget pre-populates for the customer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    /// Phone number; empty when the page has none.
    pub contact: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Theme {
    pub color: String,
}

impl CheckoutOptions {
    /// Build the widget configuration from page data, branding and the phone
    /// number read off the page (if any).
    pub fn new(
        context: &OrderPaymentContext,
        config: &CheckoutConfig,
        contact_phone: Option<&str>,
    ) -> Self {
        Self {
            key: context.gateway_key.clone(),
            amount: context.amount_minor_units,
            currency: context.currency().to_string(),
            name: config.merchant_name.clone(),
            description: config.description.clone(),
            order_id: context.order_id.clone(),
            theme: Theme {
                color: config.theme_color.clone(),
            },
            prefill: Prefill {
                name: context.user_name.clone(),
                email: context.user_email.clone(),
                contact: contact_phone.unwrap_or_default().to_string(),
            },
        }
    }
}

/// The widget's success payload. Opaque and gateway-signed: forwarded verbatim
/// to the verification endpoint, never interpreted here. A payload missing any
/// of the three fields fails to decode.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentResult {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

/// Error object attached to the widget's `payment.failed` event.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PaymentFailure {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A constructed Razorpay widget together with the closures it calls back into.
///
/// Dropping the handle drops the closures, so keep it alive for as long as the
/// widget may still fire.
pub struct CheckoutWidget {
    widget: JsRazorpay,
    _handler: Closure<dyn FnMut(JsValue)>,
    _ondismiss: Closure<dyn FnMut()>,
    _onfailed: Closure<dyn FnMut(JsValue)>,
}

impl CheckoutWidget {
    /// Show the payment modal.
    pub fn open(&self) -> Result<(), CheckoutError> {
        self.widget.open().map_err(CheckoutError::from_js)
    }

    /// Hide the payment modal.
    pub fn close(&self) -> Result<(), CheckoutError> {
        self.widget.close().map_err(CheckoutError::from_js)
    }
}

/// Construct a Razorpay widget.
///
/// # Arguments
///
/// * `options` – widget configuration, see [`CheckoutOptions::new`].
/// * `on_success` – the completion `handler`; receives the decoded payment triple,
///   or an error when the widget's response could not be read.
/// * `on_dismiss` – `modal.ondismiss`, fired when the customer closes the modal.
///
/// # Errors
///
/// Returns `Err(CheckoutError::Widget)` when `checkout.js` is not loaded or the
/// constructor throws.
pub fn create_checkout<S, D>(
    options: &CheckoutOptions,
    mut on_success: S,
    mut on_dismiss: D,
) -> Result<CheckoutWidget, CheckoutError>
where
    S: FnMut(Result<PaymentResult, CheckoutError>) + 'static,
    D: FnMut() + 'static,
{
    let opts = to_value(options).map_err(|e| CheckoutError::Widget(e.to_string()))?;

    // 1) Completion handler
    let handler = Closure::wrap(Box::new(move |response: JsValue| {
        let decoded = from_value::<PaymentResult>(response)
            .map_err(|e| CheckoutError::Widget(e.to_string()));
        on_success(decoded);
    }) as Box<dyn FnMut(JsValue)>);
    set(&opts, "handler", handler.as_ref())?;

    // 2) modal.ondismiss
    let ondismiss = Closure::wrap(Box::new(move || on_dismiss()) as Box<dyn FnMut()>);
    let modal = Object::new();
    set(&modal, "ondismiss", ondismiss.as_ref())?;
    set(&opts, "modal", &modal)?;

    // 3) Construct
    let widget = JsRazorpay::new(&opts).map_err(CheckoutError::from_js)?;

    // 4) payment.failed only informs; the modal stays open for another attempt
    let onfailed = Closure::wrap(Box::new(move |response: JsValue| {
        let failure = Reflect::get(&response, &JsValue::from_str("error"))
            .ok()
            .and_then(|e| from_value::<PaymentFailure>(e).ok())
            .unwrap_or_default();
        warn!(
            code = failure.code.as_deref().unwrap_or("-"),
            reason = failure.reason.as_deref().unwrap_or("-"),
            "payment attempt failed: {}",
            failure.description.as_deref().unwrap_or("unknown error")
        );
    }) as Box<dyn FnMut(JsValue)>);
    widget
        .on("payment.failed", onfailed.as_ref().unchecked_ref())
        .map_err(CheckoutError::from_js)?;

    Ok(CheckoutWidget {
        widget,
        _handler: handler,
        _ondismiss: ondismiss,
        _onfailed: onfailed,
    })
}

fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<(), CheckoutError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(CheckoutError::from_js)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> OrderPaymentContext {
        OrderPaymentContext {
            gateway_key: "rzp_test_abc".into(),
            amount_minor_units: 49900,
            order_id: "ord_1".into(),
            user_name: "Asha".into(),
            user_email: "asha@example.com".into(),
            csrf_token: "tok".into(),
            display_amount: "499".into(),
        }
    }

    #[test]
    fn empty_phone_prefills_empty_contact() {
        let options = CheckoutOptions::new(&context(), &CheckoutConfig::default(), None);
        assert_eq!(options.prefill.contact, "");
        assert_eq!(options.order_id, "ord_1");
    }

    #[test]
    fn options_serialize_to_widget_shape() {
        let options = CheckoutOptions::new(
            &context(),
            &CheckoutConfig::default(),
            Some("9876543210"),
        );
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "key": "rzp_test_abc",
                "amount": 49900,
                "currency": "INR",
                "name": "PetalCart 🌸",
                "description": "Thank you for your flower order!",
                "order_id": "ord_1",
                "theme": { "color": "#d88195" },
                "prefill": {
                    "name": "Asha",
                    "email": "asha@example.com",
                    "contact": "9876543210"
                }
            })
        );
    }

    #[test]
    fn payment_result_body_has_exactly_three_fields() {
        let result = PaymentResult {
            razorpay_payment_id: "pay_1".into(),
            razorpay_order_id: "ord_1".into(),
            razorpay_signature: "sig".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["razorpay_signature"], "sig");
    }

    #[test]
    fn payload_without_signature_does_not_decode() {
        let decoded = serde_json::from_str::<PaymentResult>(
            r#"{"razorpay_payment_id": "pay_1", "razorpay_order_id": "ord_1"}"#,
        );
        assert!(decoded.is_err());
    }

    #[test]
    fn payload_with_extra_widget_fields_decodes() {
        let decoded: PaymentResult = serde_json::from_str(
            r#"{
                "razorpay_payment_id": "pay_1",
                "razorpay_order_id": "ord_1",
                "razorpay_signature": "sig",
                "org_logo": ""
            }"#,
        )
        .unwrap();
        assert_eq!(decoded.razorpay_signature, "sig");
    }
}
