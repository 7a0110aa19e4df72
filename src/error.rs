//! Error type shared by every stage of the checkout flow.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Fallback shown when the server rejects a payment without saying why.
pub const VERIFICATION_FAILED_FALLBACK: &str = "Payment verification failed. Please try again.";

/// Everything that can go wrong between reading the page data and leaving the page.
///
/// The first two variants come back from the verification round-trip and are
/// recovered locally by the controller. The rest are setup failures and are
/// returned to whoever mounted the checkout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    VerificationRejected { status: u16, message: String },

    /// The request never produced a usable response (network loss, bad body, deadline).
    #[error("{0}")]
    TransportFailure(String),

    /// A required page data field is absent or blank.
    #[error("payment data is missing `{0}`")]
    MissingField(&'static str),

    /// The page data is present but unusable.
    #[error("invalid payment data: {0}")]
    InvalidPageData(String),

    /// An element the checkout binds to is not on the page.
    #[error("element `#{0}` not found")]
    MissingElement(String),

    /// Razorpay.js threw or is not loaded.
    #[error("checkout widget error: {0}")]
    Widget(String),
}

impl CheckoutError {
    /// Text for the blocking alert shown after a failed verification.
    pub fn alert_text(&self) -> String {
        match self {
            CheckoutError::VerificationRejected { message, .. } => format!("Error: {message}"),
            other => format!("An error occurred: {other}"),
        }
    }

    /// Builds a rejection from an optional server message.
    pub fn rejected(status: u16, message: Option<String>) -> Self {
        CheckoutError::VerificationRejected {
            status,
            message: message.unwrap_or_else(|| VERIFICATION_FAILED_FALLBACK.to_string()),
        }
    }

    /// Convert a caught `JsValue` into a widget error with best effort.
    pub(crate) fn from_js(value: JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                web_sys::js_sys::Reflect::get(&value, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", value));
        CheckoutError::Widget(message)
    }
}

impl From<CheckoutError> for JsValue {
    fn from(err: CheckoutError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_without_message_uses_fallback() {
        let err = CheckoutError::rejected(400, None);
        assert_eq!(
            err.alert_text(),
            "Error: Payment verification failed. Please try again."
        );
    }

    #[test]
    fn rejection_keeps_server_message() {
        let err = CheckoutError::rejected(400, Some("Signature mismatch".into()));
        assert_eq!(err.alert_text(), "Error: Signature mismatch");
    }

    #[test]
    fn transport_failure_alert_carries_description() {
        let err = CheckoutError::TransportFailure("Failed to fetch".into());
        assert_eq!(err.alert_text(), "An error occurred: Failed to fetch");
    }
}
