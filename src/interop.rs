//! yew_razorpay/src/interop.rs
//!
//! Custom Yew hook to load Razorpay Checkout at runtime (no inline JS).
//!
//! # Overview
//! This hook, `use_razorpayjs()`, injects a single
//! `<script id="razorpay-checkout-js" src="https://checkout.razorpay.com/v1/checkout.js" defer>`
//! into `<head>` on first use, returns `false` until the
//! script's `load` event fires, then returns `true`
//! on every subsequent call.
//!
//! # Usage
//! ```rust,ignore
//! use yew::prelude::*;
//! use yew_razorpay::use_razorpayjs;
//!
//! #[function_component(App)]
//! fn app() -> Html {
//!     let ready = use_razorpayjs();
//!     html! {
//!         if ready {
//!             <p>{"✅ Razorpay loaded"}</p>
//!         } else {
//!             <p>{"⏳ Loading Razorpay..."}</p>
//!         }
//!     }
//! }
//! ```

use tracing::error;
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use web_sys::js_sys::Reflect;
use web_sys::HtmlScriptElement;
use yew::functional::hook;
use yew::prelude::*;

use crate::error::CheckoutError;

pub const CHECKOUT_SCRIPT_ID: &str = "razorpay-checkout-js";
pub const CHECKOUT_SCRIPT_SRC: &str = "https://checkout.razorpay.com/v1/checkout.js";

/// Whether `window.Razorpay` exists yet.
pub fn razorpay_loaded() -> bool {
    web_sys::window()
        .and_then(|win| Reflect::has(&win, &JsValue::from_str("Razorpay")).ok())
        .unwrap_or(false)
}

/// Custom hook: load `checkout.js` exactly once and track readiness.
///
/// # Returns
/// - `false` while the `<script>` is being fetched & parsed.
/// - `true` once `window.Razorpay` exists.
#[hook]
pub fn use_razorpayjs() -> bool {
    let loaded = use_state(razorpay_loaded);

    {
        let loaded = loaded.clone();
        use_effect_with((), move |_| {
            if !*loaded {
                if let Err(err) = inject_script(loaded) {
                    error!(error = %CheckoutError::from_js(err), "failed to load checkout.js");
                }
            }
            || ()
        });
    }

    *loaded
}

fn inject_script(loaded: UseStateHandle<bool>) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Another component already started the load; listen on its tag too.
    if let Some(existing) = document.get_element_by_id(CHECKOUT_SCRIPT_ID) {
        let script: HtmlScriptElement = existing.dyn_into()?;
        let onload = Closure::once_into_js(move || loaded.set(true));
        script.add_event_listener_with_callback("load", onload.unchecked_ref())?;
        return Ok(());
    }

    let script: HtmlScriptElement = document.create_element("script")?.dyn_into()?;
    script.set_id(CHECKOUT_SCRIPT_ID);
    script.set_src(CHECKOUT_SCRIPT_SRC);
    script.set_defer(true);

    let onload = Closure::once_into_js(move || loaded.set(true));
    script.add_event_listener_with_callback("load", onload.unchecked_ref())?;

    document
        .head()
        .ok_or_else(|| JsValue::from_str("head missing"))?
        .append_child(&script)?;
    Ok(())
}
