//! Plain-page checkout: binds the controller to server-rendered markup.
//!
//! The page carries a `#pay-btn` button, an optional `#phone` input and a
//! `window.paymentData` record. [`start_checkout`] is the JS entry point; hosts
//! that already hold the elements call [`mount_checkout`] directly.

use std::rc::Rc;

use tracing::{debug, error};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{Document, HtmlButtonElement, HtmlInputElement, MouseEvent};

use crate::{
    client::{create_checkout, CheckoutOptions, CheckoutWidget, PaymentResult},
    context::{CheckoutConfig, OrderPaymentContext},
    controller::{ButtonView, CheckoutController, PageEffects, PayButton},
    error::CheckoutError,
    logging::init_console_logging,
    transport::{BrowserTimer, FetchTransport},
};

pub const PAY_BUTTON_ID: &str = "pay-btn";
pub const PHONE_INPUT_ID: &str = "phone";

/// Controller wired to `fetch` and `setTimeout`.
pub type BrowserController = CheckoutController<FetchTransport, BrowserTimer>;

/// A `<button>` the controller draws into.
#[derive(Clone, Debug)]
pub struct DomPayButton {
    element: HtmlButtonElement,
}

impl DomPayButton {
    pub fn new(element: HtmlButtonElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlButtonElement {
        &self.element
    }
}

impl PayButton for DomPayButton {
    fn render(&self, view: &ButtonView) {
        self.element.set_disabled(view.disabled);
        self.element.set_inner_html(&view.label.to_html());
    }
}

/// `window.location` and `window.alert`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserPage;

impl PageEffects for BrowserPage {
    fn navigate(&self, location: &str) {
        let Some(window) = web_sys::window() else {
            error!(location, "no window to navigate");
            return;
        };
        if let Err(e) = window.location().set_href(location) {
            error!(location, error = %CheckoutError::from_js(e), "navigation failed");
        }
    }

    fn alert(&self, message: &str) {
        let Some(window) = web_sys::window() else {
            error!(message, "no window to alert");
            return;
        };
        if let Err(e) = window.alert_with_message(message) {
            error!(error = %CheckoutError::from_js(e), "alert failed");
        }
    }
}

/// A checkout bound to a button. Dropping it unbinds the click handler and
/// releases the widget callbacks; call [`MountedCheckout::forget`] to keep it
/// for the lifetime of the page.
pub struct MountedCheckout {
    controller: Rc<BrowserController>,
    button: HtmlButtonElement,
    _widget: Rc<CheckoutWidget>,
    _onclick: Closure<dyn FnMut(MouseEvent)>,
}

impl MountedCheckout {
    pub fn controller(&self) -> &BrowserController {
        &self.controller
    }

    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for MountedCheckout {
    fn drop(&mut self) {
        self.button.set_onclick(None);
    }
}

/// Build the widget configuration, construct the widget and bind the pay button.
///
/// The phone input is read once, here. Must run after the DOM is ready.
pub fn mount_checkout(
    context: OrderPaymentContext,
    config: CheckoutConfig,
    phone: Option<&HtmlInputElement>,
    button: HtmlButtonElement,
) -> Result<MountedCheckout, CheckoutError> {
    let contact = phone.map(|input| input.value());
    let options = CheckoutOptions::new(&context, &config, contact.as_deref());

    let controller = Rc::new(CheckoutController::new(
        context,
        config,
        Rc::new(DomPayButton::new(button.clone())),
        Rc::new(BrowserPage),
        FetchTransport,
        BrowserTimer,
    ));

    let on_success = {
        let controller = controller.clone();
        move |result: Result<PaymentResult, CheckoutError>| match result {
            Ok(paid) => {
                let controller = controller.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    controller.on_payment_success(paid).await;
                });
            }
            Err(err) => {
                controller.report_failure(err);
            }
        }
    };
    let on_dismiss = {
        let controller = controller.clone();
        move || controller.on_dismiss()
    };
    let widget = Rc::new(create_checkout(&options, on_success, on_dismiss)?);

    let onclick = {
        let controller = controller.clone();
        let widget = widget.clone();
        Closure::wrap(Box::new(move |event: MouseEvent| {
            event.prevent_default();
            if controller.begin_open() {
                if let Err(err) = widget.open() {
                    controller.report_failure(err);
                }
            }
        }) as Box<dyn FnMut(MouseEvent)>)
    };
    button.set_onclick(Some(onclick.as_ref().unchecked_ref()));

    Ok(MountedCheckout {
        controller,
        button,
        _widget: widget,
        _onclick: onclick,
    })
}

/// Look up `#pay-btn` and `#phone` in `document` and mount on them.
pub fn mount_on_document(
    document: &Document,
    context: OrderPaymentContext,
    config: CheckoutConfig,
) -> Result<MountedCheckout, CheckoutError> {
    let button = document
        .get_element_by_id(PAY_BUTTON_ID)
        .and_then(|el| el.dyn_into::<HtmlButtonElement>().ok())
        .ok_or_else(|| CheckoutError::MissingElement(PAY_BUTTON_ID.to_string()))?;
    let phone = document
        .get_element_by_id(PHONE_INPUT_ID)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
    if phone.is_none() {
        debug!("no #{PHONE_INPUT_ID} input, contact will be left empty");
    }
    mount_checkout(context, config, phone.as_ref(), button)
}

/// JS entry point: read `window.paymentData` and mount on the page once the
/// DOM is ready.
#[wasm_bindgen]
pub fn start_checkout() -> Result<(), JsValue> {
    init_console_logging(tracing::Level::INFO);

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    if document.ready_state() == "loading" {
        let ready_document = document.clone();
        let on_ready = Closure::once_into_js(move || {
            if let Err(err) = mount_page(&ready_document) {
                error!(error = %err, "checkout setup failed");
            }
        });
        document.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())?;
        Ok(())
    } else {
        mount_page(&document).map_err(JsValue::from)
    }
}

fn mount_page(document: &Document) -> Result<(), CheckoutError> {
    let context = OrderPaymentContext::from_window()?;
    mount_on_document(document, context, CheckoutConfig::default())?.forget();
    Ok(())
}
