//! The checkout flow controller.
//!
//! Owns the pay button's state and the verification round-trip that follows a
//! successful widget payment. Every effect goes through an injected
//! collaborator ([`PayButton`], [`PageEffects`], [`VerificationTransport`],
//! [`Timer`]) so the flow runs the same in the browser and in native tests.
//!
//! Button states:
//!
//! ```text
//! Idle --open--> Open --success--> Processing --2xx--> Redirected
//!  ^              |                    |
//!  +---dismiss----+                    |
//!  +-------------rejected / transport failure / deadline
//! ```

use std::{cell::Cell, future::Future, pin::pin, rc::Rc, time::Duration};

use futures::future::{select, Either};
use tracing::{error, info, warn};

use crate::{
    client::PaymentResult,
    context::{CheckoutConfig, OrderPaymentContext},
    error::CheckoutError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    /// Clickable, showing the amount.
    Idle,
    /// Widget modal is up; the button stays disabled until it resolves.
    Open,
    /// Verification request in flight.
    Processing,
    /// Server accepted the payment and the page is leaving.
    Redirected,
}

/// What the pay button says.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonLabel {
    Pay { amount: String },
    Processing,
}

impl ButtonLabel {
    /// Markup for pages that style the button through these class names.
    pub fn to_html(&self) -> String {
        match self {
            ButtonLabel::Pay { amount } => format!(
                "<span class=\"btn-icon\">🚀</span> Pay Securely with Razorpay <span class=\"btn-amount\">₹{amount}</span>"
            ),
            ButtonLabel::Processing => "<span class=\"spinner\"></span> Processing...".to_string(),
        }
    }
}

/// Everything a button implementation needs to draw itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonView {
    pub disabled: bool,
    pub label: ButtonLabel,
}

impl ButtonView {
    pub fn idle(amount: &str) -> Self {
        Self {
            disabled: false,
            label: ButtonLabel::Pay {
                amount: amount.to_string(),
            },
        }
    }

    pub fn open(amount: &str) -> Self {
        Self {
            disabled: true,
            ..Self::idle(amount)
        }
    }

    pub fn processing() -> Self {
        Self {
            disabled: true,
            label: ButtonLabel::Processing,
        }
    }
}

/// The pay button handle.
pub trait PayButton {
    fn render(&self, view: &ButtonView);
}

/// Page-level side effects.
pub trait PageEffects {
    fn navigate(&self, location: &str);
    /// Blocking user-facing message.
    fn alert(&self, message: &str);
}

/// Server's answer to a verification POST.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResponse {
    /// HTTP status was 2xx.
    pub ok: bool,
    pub status: u16,
    /// Non-empty `message` string from the JSON body.
    pub message: Option<String>,
}

impl VerificationResponse {
    /// Build from the parsed JSON body. Extra fields and non-object bodies are tolerated.
    pub fn from_json_body(ok: bool, status: u16, body: &serde_json::Value) -> Self {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        Self {
            ok,
            status,
            message,
        }
    }
}

/// Sends the payment triple to the verification endpoint.
///
/// Implementations parse the body as JSON whatever the status is, and report a
/// request that never produced a readable response as
/// [`CheckoutError::TransportFailure`].
#[allow(async_fn_in_trait)]
pub trait VerificationTransport {
    async fn post_verification(
        &self,
        endpoint: &str,
        csrf_token: &str,
        result: &PaymentResult,
    ) -> Result<VerificationResponse, CheckoutError>;
}

/// Source of the verification deadline.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// How a completion callback ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Payment verified; the page is navigating to the contained location.
    Redirected(String),
    /// Verification failed; the button is back to idle and the user was alerted.
    Failed(CheckoutError),
    /// A verification was already pending, or the page is already leaving.
    Ignored,
}

pub struct CheckoutController<T, S> {
    context: OrderPaymentContext,
    config: CheckoutConfig,
    button: Rc<dyn PayButton>,
    page: Rc<dyn PageEffects>,
    transport: T,
    timer: S,
    state: Cell<ButtonState>,
}

impl<T, S> CheckoutController<T, S>
where
    T: VerificationTransport,
    S: Timer,
{
    pub fn new(
        context: OrderPaymentContext,
        config: CheckoutConfig,
        button: Rc<dyn PayButton>,
        page: Rc<dyn PageEffects>,
        transport: T,
        timer: S,
    ) -> Self {
        Self {
            context,
            config,
            button,
            page,
            transport,
            timer,
            state: Cell::new(ButtonState::Idle),
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state.get()
    }

    pub fn context(&self) -> &OrderPaymentContext {
        &self.context
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The label the button shows whenever it is idle.
    pub fn idle_view(&self) -> ButtonView {
        ButtonView::idle(&self.context.display_amount)
    }

    /// Claim the button for a widget session. Returns `false` (and changes
    /// nothing) unless the button is idle; the caller opens the widget only on `true`.
    pub fn begin_open(&self) -> bool {
        if self.state.get() != ButtonState::Idle {
            warn!(state = ?self.state.get(), "pay button pressed while checkout is busy");
            return false;
        }
        info!(order_id = %self.context.order_id, "opening payment window");
        self.state.set(ButtonState::Open);
        self.button
            .render(&ButtonView::open(&self.context.display_amount));
        true
    }

    /// `modal.ondismiss`: the customer closed the widget without paying.
    pub fn on_dismiss(&self) {
        info!("Payment window closed");
        if self.state.get() == ButtonState::Open {
            self.reset_button();
        }
    }

    /// The widget's completion callback.
    pub async fn on_payment_success(&self, result: PaymentResult) -> CheckoutOutcome {
        match self.state.get() {
            ButtonState::Processing | ButtonState::Redirected => {
                warn!(
                    payment_id = %result.razorpay_payment_id,
                    "ignoring payment completion while another is being verified"
                );
                return CheckoutOutcome::Ignored;
            }
            ButtonState::Idle | ButtonState::Open => {}
        }

        self.state.set(ButtonState::Processing);
        self.button.render(&ButtonView::processing());

        match self.verify(&result).await {
            Ok(()) => {
                let target = self.config.success_redirect.clone();
                info!(order_id = %self.context.order_id, %target, "payment verified");
                self.state.set(ButtonState::Redirected);
                self.page.navigate(&target);
                CheckoutOutcome::Redirected(target)
            }
            Err(err) => {
                match &err {
                    CheckoutError::VerificationRejected { status, message } => {
                        error!(status, %message, "Payment verification failed")
                    }
                    other => error!(error = %other, "Payment verification request failed"),
                }
                self.recover(err)
            }
        }
    }

    /// Recover from a failure outside the verification request itself, e.g.
    /// an unreadable widget response.
    pub fn report_failure(&self, err: CheckoutError) -> CheckoutOutcome {
        if self.state.get() == ButtonState::Redirected {
            return CheckoutOutcome::Ignored;
        }
        error!(error = %err, "checkout failed");
        self.recover(err)
    }

    /// Back to idle: enabled, showing the amount from the page data.
    pub fn reset_button(&self) {
        self.state.set(ButtonState::Idle);
        self.button.render(&self.idle_view());
    }

    fn recover(&self, err: CheckoutError) -> CheckoutOutcome {
        self.reset_button();
        self.page.alert(&err.alert_text());
        CheckoutOutcome::Failed(err)
    }

    async fn verify(&self, result: &PaymentResult) -> Result<(), CheckoutError> {
        let timeout = self.config.verification_timeout;
        let request = pin!(self.transport.post_verification(
            &self.config.verify_endpoint,
            &self.context.csrf_token,
            result,
        ));
        let deadline = pin!(self.timer.sleep(timeout));

        let response = match select(request, deadline).await {
            Either::Left((response, _)) => response?,
            Either::Right(((), _)) => {
                return Err(CheckoutError::TransportFailure(format!(
                    "verification request timed out after {timeout:?}"
                )))
            }
        };

        if response.ok {
            Ok(())
        } else {
            Err(CheckoutError::rejected(response.status, response.message))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::VecDeque};

    use futures::{channel::oneshot, executor::block_on, future};

    use super::*;

    #[derive(Default)]
    struct RecordingButton {
        views: RefCell<Vec<ButtonView>>,
    }

    impl PayButton for RecordingButton {
        fn render(&self, view: &ButtonView) {
            self.views.borrow_mut().push(view.clone());
        }
    }

    #[derive(Default)]
    struct RecordingPage {
        navigations: RefCell<Vec<String>>,
        alerts: RefCell<Vec<String>>,
    }

    impl PageEffects for RecordingPage {
        fn navigate(&self, location: &str) {
            self.navigations.borrow_mut().push(location.to_string());
        }

        fn alert(&self, message: &str) {
            self.alerts.borrow_mut().push(message.to_string());
        }
    }

    enum Reply {
        Ready(Result<VerificationResponse, CheckoutError>),
        Later(oneshot::Receiver<Result<VerificationResponse, CheckoutError>>),
        Never,
    }

    #[derive(Default)]
    struct ScriptedTransport {
        replies: RefCell<VecDeque<Reply>>,
        calls: RefCell<Vec<(String, String, PaymentResult)>>,
    }

    impl VerificationTransport for ScriptedTransport {
        async fn post_verification(
            &self,
            endpoint: &str,
            csrf_token: &str,
            result: &PaymentResult,
        ) -> Result<VerificationResponse, CheckoutError> {
            self.calls.borrow_mut().push((
                endpoint.to_string(),
                csrf_token.to_string(),
                result.clone(),
            ));
            let reply = self.replies.borrow_mut().pop_front();
            match reply {
                Some(Reply::Ready(r)) => r,
                Some(Reply::Later(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(CheckoutError::TransportFailure("dropped".into()))),
                Some(Reply::Never) => future::pending().await,
                None => Err(CheckoutError::TransportFailure("no scripted reply".into())),
            }
        }
    }

    struct NoDeadline;

    impl Timer for NoDeadline {
        fn sleep(&self, _: Duration) -> impl Future<Output = ()> {
            future::pending()
        }
    }

    struct ExpiredDeadline;

    impl Timer for ExpiredDeadline {
        fn sleep(&self, _: Duration) -> impl Future<Output = ()> {
            future::ready(())
        }
    }

    struct Harness<S> {
        button: Rc<RecordingButton>,
        page: Rc<RecordingPage>,
        controller: CheckoutController<ScriptedTransport, S>,
    }

    fn harness_with<S: Timer>(replies: Vec<Reply>, timer: S) -> Harness<S> {
        let button = Rc::new(RecordingButton::default());
        let page = Rc::new(RecordingPage::default());
        let transport = ScriptedTransport {
            replies: RefCell::new(replies.into()),
            ..Default::default()
        };
        let controller = CheckoutController::new(
            context(),
            CheckoutConfig::default(),
            button.clone(),
            page.clone(),
            transport,
            timer,
        );
        Harness {
            button,
            page,
            controller,
        }
    }

    fn harness(replies: Vec<Reply>) -> Harness<NoDeadline> {
        harness_with(replies, NoDeadline)
    }

    fn context() -> OrderPaymentContext {
        OrderPaymentContext {
            gateway_key: "rzp_test_abc".into(),
            amount_minor_units: 49900,
            order_id: "ord_1".into(),
            user_name: "Asha".into(),
            user_email: "asha@example.com".into(),
            csrf_token: "csrf-tok".into(),
            display_amount: "499".into(),
        }
    }

    fn paid() -> PaymentResult {
        PaymentResult {
            razorpay_payment_id: "pay_29QQoUBi66xm2f".into(),
            razorpay_order_id: "ord_1".into(),
            razorpay_signature: "9ef4dffbfd84f1318f6739a3ce19f9d85851857ae648f114332d8401e0949a3d"
                .into(),
        }
    }

    fn response(status: u16, body: serde_json::Value) -> Reply {
        Reply::Ready(Ok(VerificationResponse::from_json_body(
            (200..300).contains(&status),
            status,
            &body,
        )))
    }

    #[test]
    fn success_posts_once_and_redirects_without_reset() {
        let h = harness(vec![response(200, serde_json::json!({"status": "ok"}))]);
        assert!(h.controller.begin_open());

        let outcome = block_on(h.controller.on_payment_success(paid()));

        assert_eq!(outcome, CheckoutOutcome::Redirected("/order_history/".into()));
        assert_eq!(*h.page.navigations.borrow(), vec!["/order_history/"]);
        assert!(h.page.alerts.borrow().is_empty());
        assert_eq!(h.controller.state(), ButtonState::Redirected);

        let calls = h.controller.transport().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "/payment-success/");
        assert_eq!(calls[0].1, "csrf-tok");
        assert_eq!(calls[0].2, paid());

        assert_eq!(
            *h.button.views.borrow(),
            vec![ButtonView::open("499"), ButtonView::processing()]
        );
    }

    #[test]
    fn rejection_alerts_server_message_and_restores_button() {
        let h = harness(vec![response(
            400,
            serde_json::json!({"message": "Signature mismatch"}),
        )]);
        h.controller.begin_open();

        let outcome = block_on(h.controller.on_payment_success(paid()));

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(CheckoutError::VerificationRejected { status: 400, .. })
        ));
        let alerts = h.page.alerts.borrow();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("Signature mismatch"));
        assert_eq!(h.controller.state(), ButtonState::Idle);
        assert_eq!(h.button.views.borrow().last(), Some(&ButtonView::idle("499")));
        assert!(h.page.navigations.borrow().is_empty());
    }

    #[test]
    fn rejection_without_message_uses_generic_text() {
        let h = harness(vec![response(500, serde_json::json!({}))]);

        block_on(h.controller.on_payment_success(paid()));

        assert_eq!(
            *h.page.alerts.borrow(),
            vec!["Error: Payment verification failed. Please try again."]
        );
    }

    #[test]
    fn transport_failure_resets_and_alerts_description() {
        let h = harness(vec![Reply::Ready(Err(CheckoutError::TransportFailure(
            "Failed to fetch".into(),
        )))]);

        let outcome = block_on(h.controller.on_payment_success(paid()));

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(CheckoutError::TransportFailure(_))
        ));
        assert_eq!(
            *h.page.alerts.borrow(),
            vec!["An error occurred: Failed to fetch"]
        );
        assert!(h.page.navigations.borrow().is_empty());
        assert_eq!(h.button.views.borrow().last(), Some(&ButtonView::idle("499")));
    }

    #[test]
    fn expired_deadline_is_a_transport_failure() {
        let h = harness_with(vec![Reply::Never], ExpiredDeadline);

        let outcome = block_on(h.controller.on_payment_success(paid()));

        match outcome {
            CheckoutOutcome::Failed(CheckoutError::TransportFailure(msg)) => {
                assert!(msg.contains("timed out"), "{msg}")
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.controller.state(), ButtonState::Idle);
    }

    #[test]
    fn second_completion_while_pending_is_ignored() {
        let (tx, rx) = oneshot::channel();
        let h = harness(vec![Reply::Later(rx)]);
        let controller = &h.controller;

        let (first, second, ()) = block_on(async move {
            futures::join!(
                controller.on_payment_success(paid()),
                controller.on_payment_success(paid()),
                async move {
                    let _ = tx.send(Ok(VerificationResponse {
                        ok: true,
                        status: 200,
                        message: None,
                    }));
                }
            )
        });

        assert_eq!(first, CheckoutOutcome::Redirected("/order_history/".into()));
        assert_eq!(second, CheckoutOutcome::Ignored);
        assert_eq!(h.controller.transport().calls.borrow().len(), 1);
    }

    #[test]
    fn completion_after_redirect_is_ignored() {
        let h = harness(vec![response(200, serde_json::json!({}))]);
        block_on(h.controller.on_payment_success(paid()));

        let outcome = block_on(h.controller.on_payment_success(paid()));

        assert_eq!(outcome, CheckoutOutcome::Ignored);
        assert_eq!(h.page.navigations.borrow().len(), 1);
    }

    #[test]
    fn button_stays_disabled_while_widget_is_open() {
        let h = harness(vec![]);

        assert!(h.controller.begin_open());
        assert!(!h.controller.begin_open());

        assert_eq!(h.controller.state(), ButtonState::Open);
        assert_eq!(*h.button.views.borrow(), vec![ButtonView::open("499")]);
    }

    #[test]
    fn dismissal_reenables_button() {
        let h = harness(vec![]);
        h.controller.begin_open();

        h.controller.on_dismiss();

        assert_eq!(h.controller.state(), ButtonState::Idle);
        assert_eq!(h.button.views.borrow().last(), Some(&ButtonView::idle("499")));
        assert!(h.page.alerts.borrow().is_empty());
    }

    #[test]
    fn dismissal_when_idle_changes_nothing() {
        let h = harness(vec![]);

        h.controller.on_dismiss();

        assert_eq!(h.controller.state(), ButtonState::Idle);
        assert!(h.button.views.borrow().is_empty());
    }

    #[test]
    fn reset_is_idempotent() {
        let h = harness(vec![]);

        h.controller.reset_button();
        let once = h.button.views.borrow().last().cloned();
        h.controller.reset_button();
        h.controller.reset_button();

        assert_eq!(h.button.views.borrow().last().cloned(), once);
        assert_eq!(once, Some(ButtonView::idle("499")));
        assert_eq!(h.controller.state(), ButtonState::Idle);
    }

    #[test]
    fn unreadable_widget_response_recovers_like_a_failed_verification() {
        let h = harness(vec![]);
        h.controller.begin_open();

        let outcome = h
            .controller
            .report_failure(CheckoutError::Widget("bad response".into()));

        assert!(matches!(outcome, CheckoutOutcome::Failed(_)));
        assert_eq!(h.controller.state(), ButtonState::Idle);
        assert_eq!(h.page.alerts.borrow().len(), 1);
    }

    #[test]
    fn idle_label_markup_shows_amount() {
        assert_eq!(
            ButtonLabel::Pay {
                amount: "499".into()
            }
            .to_html(),
            "<span class=\"btn-icon\">🚀</span> Pay Securely with Razorpay <span class=\"btn-amount\">₹499</span>"
        );
        assert_eq!(
            ButtonLabel::Processing.to_html(),
            "<span class=\"spinner\"></span> Processing..."
        );
    }

    #[test]
    fn response_message_ignores_empty_and_non_string() {
        let empty = VerificationResponse::from_json_body(false, 400, &serde_json::json!({"message": ""}));
        let number = VerificationResponse::from_json_body(false, 400, &serde_json::json!({"message": 3}));
        let list = VerificationResponse::from_json_body(false, 400, &serde_json::json!([1, 2]));
        assert_eq!(empty.message, None);
        assert_eq!(number.message, None);
        assert_eq!(list.message, None);
    }
}
