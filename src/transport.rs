//! Browser implementations of the controller's network and clock seams.

use std::{future::Future, time::Duration};

use gloo_net::http::Request;
use tracing::{debug, warn};
use wasm_bindgen_futures::JsFuture;
use web_sys::{js_sys::Promise, AbortController};

use crate::{
    client::PaymentResult,
    controller::{Timer, VerificationResponse, VerificationTransport},
    error::CheckoutError,
};

/// Posts the payment triple with `fetch`, same-origin cookies included.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchTransport;

impl VerificationTransport for FetchTransport {
    async fn post_verification(
        &self,
        endpoint: &str,
        csrf_token: &str,
        result: &PaymentResult,
    ) -> Result<VerificationResponse, CheckoutError> {
        // Dropped when the deadline wins the race, which cancels the fetch.
        let abort = AbortOnDrop::new()?;
        let mut request = Request::post(endpoint).abort_signal(Some(&abort.0.signal()));
        for (name, value) in verification_headers(csrf_token) {
            request = request.header(name, value);
        }
        let request = request.json(result).map_err(transport_error)?;

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(status, endpoint, "verification response received");

        let body = response.text().await.map_err(transport_error)?;
        decode_response(response.ok(), status, &body)
    }
}

/// Headers sent with every verification POST.
pub fn verification_headers(csrf_token: &str) -> [(&'static str, &str); 2] {
    [
        ("Content-Type", "application/json"),
        ("X-CSRFToken", csrf_token),
    ]
}

/// Turn a verification response into the controller's view of it.
///
/// Failure responses carry a JSON body too, so the body is parsed whatever the
/// status. A body that is not JSON means nothing usable came back.
pub fn decode_response(
    ok: bool,
    status: u16,
    body: &str,
) -> Result<VerificationResponse, CheckoutError> {
    let body: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        CheckoutError::TransportFailure(format!("unreadable verification response: {e}"))
    })?;
    Ok(VerificationResponse::from_json_body(ok, status, &body))
}

// JS errors surface by message alone, e.g. "Failed to fetch".
fn transport_error(err: gloo_net::Error) -> CheckoutError {
    let message = match err {
        gloo_net::Error::JsError(js) => js.message,
        other => other.to_string(),
    };
    CheckoutError::TransportFailure(message)
}

struct AbortOnDrop(AbortController);

impl AbortOnDrop {
    fn new() -> Result<Self, CheckoutError> {
        AbortController::new()
            .map(Self)
            .map_err(|e| {
                CheckoutError::TransportFailure(
                    e.as_string()
                        .unwrap_or_else(|| "AbortController unavailable".to_string()),
                )
            })
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        // No-op once the response body has been read.
        self.0.abort();
    }
}

// `setTimeout` takes a signed 32-bit delay.
fn timeout_millis(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

/// `setTimeout` wrapped in a promise. Without a window the sleep never ends, so
/// the verification has no deadline; that is logged.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        let millis = timeout_millis(duration);
        let promise = Promise::new(&mut |resolve, _reject| {
            let Some(window) = web_sys::window() else {
                warn!("no window, verification deadline disabled");
                return;
            };
            if let Err(e) =
                window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
            {
                warn!(
                    error = %CheckoutError::from_js(e),
                    "setTimeout failed, verification deadline disabled"
                );
            }
        });
        async move {
            let _ = JsFuture::from(promise).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_carry_json_type_and_csrf_token() {
        assert_eq!(
            verification_headers("tok-123"),
            [
                ("Content-Type", "application/json"),
                ("X-CSRFToken", "tok-123"),
            ]
        );
    }

    #[test]
    fn rejected_status_with_json_body_keeps_message() {
        let response =
            decode_response(false, 400, r#"{"status": "error", "message": "Signature mismatch"}"#)
                .unwrap();
        assert_eq!(
            response,
            VerificationResponse {
                ok: false,
                status: 400,
                message: Some("Signature mismatch".into()),
            }
        );
    }

    #[test]
    fn accepted_status_ignores_extra_fields() {
        let response =
            decode_response(true, 200, r#"{"status": "ok", "order": 17, "message": ""}"#).unwrap();
        assert!(response.ok);
        assert_eq!(response.status, 200);
        assert_eq!(response.message, None);
    }

    #[test]
    fn html_error_page_is_a_transport_failure() {
        let err = decode_response(false, 502, "<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, CheckoutError::TransportFailure(_)));
    }

    #[test]
    fn empty_body_is_a_transport_failure() {
        assert!(matches!(
            decode_response(true, 200, ""),
            Err(CheckoutError::TransportFailure(_))
        ));
    }

    #[test]
    fn non_js_errors_keep_their_display_text() {
        let err = transport_error(gloo_net::Error::GlooError("body already used".into()));
        assert_eq!(err, CheckoutError::TransportFailure("body already used".into()));
        assert_eq!(err.alert_text(), "An error occurred: body already used");
    }

    #[test]
    fn sleep_delay_clamps_to_set_timeout_range() {
        assert_eq!(timeout_millis(Duration::ZERO), 0);
        assert_eq!(timeout_millis(Duration::from_secs(30)), 30_000);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), i32::MAX);
    }
}
