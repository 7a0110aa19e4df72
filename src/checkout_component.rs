//! A drop-in Yew Razorpay checkout for apps that render the pay page themselves.
//!
//! This component loads `checkout.js`, collects the customer's phone number,
//! opens the widget on click and runs the same verification flow as the
//! plain-page integration, emitting any failure to the app.

use std::{cell::RefCell, rc::Rc};

use yew::prelude::*;

use crate::{
    client::{create_checkout, CheckoutOptions, CheckoutWidget, PaymentResult},
    components::{Button, TextInput},
    context::{CheckoutConfig, OrderPaymentContext},
    controller::{ButtonLabel, ButtonView, CheckoutController, CheckoutOutcome, PayButton},
    dom::{BrowserController, BrowserPage, PAY_BUTTON_ID, PHONE_INPUT_ID},
    error::CheckoutError,
    interop::use_razorpayjs,
    transport::{BrowserTimer, FetchTransport},
};

/// Properties for the [`RazorpayCheckout`] component.
///
/// # Fields
///
/// * `context` – Validated order data, see [`OrderPaymentContext::from_window`].
/// * `config` – Branding, routes and verification deadline (defaults apply).
/// * `on_error` – Invoked with every failure after the button has been restored.
/// * `children` – Extra nodes (e.g. order summary) rendered above the form.
#[derive(Properties, PartialEq, Clone)]
pub struct RazorpayCheckoutProps {
    pub context: OrderPaymentContext,
    #[prop_or_default]
    pub config: CheckoutConfig,
    #[prop_or_default]
    pub on_error: Callback<CheckoutError>,
    #[prop_or_default]
    pub children: Children,
}

/// Pay button state held in a Yew state handle.
struct StatePayButton(UseStateHandle<ButtonView>);

impl PayButton for StatePayButton {
    fn render(&self, view: &ButtonView) {
        self.0.set(view.clone());
    }
}

/// Yew function component rendering a Razorpay pay form.
///
/// # Example
///
/// ```rust,ignore
/// use yew::prelude::*;
/// use yew_razorpay::{OrderPaymentContext, RazorpayCheckout};
///
/// #[function_component(App)]
/// fn app() -> Html {
///     let Ok(context) = OrderPaymentContext::from_window() else {
///         return html! { <p>{ "Payment data unavailable" }</p> };
///     };
///     let on_error = Callback::from(|err: yew_razorpay::CheckoutError| {
///         tracing::error!("checkout failed: {err}");
///     });
///     html! {
///         <RazorpayCheckout {context} {on_error}>
///             <p>{ "Dozen red roses – ₹499" }</p>
///         </RazorpayCheckout>
///     }
/// }
/// ```
///
/// The phone number is read when the widget is configured, i.e. on each click.
#[function_component(RazorpayCheckout)]
pub fn razorpay_checkout(props: &RazorpayCheckoutProps) -> Html {
    let ready = use_razorpayjs();
    let phone = use_state(String::new);
    let view = use_state(|| ButtonView::idle(&props.context.display_amount));
    let widget = use_mut_ref(|| None::<CheckoutWidget>);

    let controller: Rc<BrowserController> = {
        let view = view.clone();
        use_memo(
            (props.context.clone(), props.config.clone()),
            move |(context, config)| {
                CheckoutController::new(
                    context.clone(),
                    config.clone(),
                    Rc::new(StatePayButton(view)),
                    Rc::new(BrowserPage),
                    FetchTransport,
                    BrowserTimer,
                )
            },
        )
    };

    let on_phone = {
        let phone = phone.clone();
        Callback::from(move |value: String| phone.set(value))
    };

    let on_click = {
        let controller = controller.clone();
        let widget = widget.clone();
        let phone = phone.clone();
        let on_error = props.on_error.clone();

        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            if !controller.begin_open() {
                return;
            }
            let options =
                CheckoutOptions::new(controller.context(), controller.config(), Some(phone.as_str()));
            let created = create_checkout(
                &options,
                completion_handler(controller.clone(), on_error.clone()),
                {
                    let controller = controller.clone();
                    move || controller.on_dismiss()
                },
            );
            if let Err(err) = open_widget(&widget, created) {
                controller.report_failure(err.clone());
                on_error.emit(err);
            }
        })
    };

    html! {
        <div class="razorpay-checkout">
            { for props.children.iter() }
            <TextInput
                id={PHONE_INPUT_ID}
                input_type="tel"
                value={(*phone).clone()}
                oninput={on_phone}
                placeholder="Phone number"
            />
            <Button id={PAY_BUTTON_ID} onclick={on_click} disabled={!ready || view.disabled}>
                { label_html(&view.label) }
            </Button>
        </div>
    }
}

fn open_widget(
    slot: &Rc<RefCell<Option<CheckoutWidget>>>,
    created: Result<CheckoutWidget, CheckoutError>,
) -> Result<(), CheckoutError> {
    let widget = created?;
    let opened = widget.open();
    // The previous session is over; its callbacks can go.
    *slot.borrow_mut() = Some(widget);
    opened
}

fn completion_handler(
    controller: Rc<BrowserController>,
    on_error: Callback<CheckoutError>,
) -> impl FnMut(Result<PaymentResult, CheckoutError>) + 'static {
    move |result| match result {
        Ok(paid) => {
            let controller = controller.clone();
            let on_error = on_error.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let CheckoutOutcome::Failed(err) = controller.on_payment_success(paid).await {
                    on_error.emit(err);
                }
            });
        }
        Err(err) => {
            controller.report_failure(err.clone());
            on_error.emit(err);
        }
    }
}

fn label_html(label: &ButtonLabel) -> Html {
    match label {
        ButtonLabel::Pay { amount } => html! {
            <>
                <span class="btn-icon">{ "🚀" }</span>
                { " Pay Securely with Razorpay " }
                <span class="btn-amount">{ format!("₹{amount}") }</span>
            </>
        },
        ButtonLabel::Processing => html! {
            <>
                <span class="spinner"></span>
                { " Processing..." }
            </>
        },
    }
}
