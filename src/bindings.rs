//! yew_razorpay/src/bindings.rs
//!
//! Low-level wasm-bindgen bindings to Razorpay Checkout (`checkout.js`).
//!
//! Exposes the raw widget handle (`JsRazorpay`) and the handful of methods the
//! checkout flow needs. Higher-level wrappers live in `client.rs`.

use wasm_bindgen::prelude::*;
use web_sys::js_sys::Function;

#[wasm_bindgen]
extern "C" {
    //------------------------------------------------------------------------------
    // Core Types
    //------------------------------------------------------------------------------

    /// Raw Razorpay Checkout instance.
    #[wasm_bindgen(js_name = Razorpay)]
    #[derive(Debug, Clone)]
    pub type JsRazorpay;

    //------------------------------------------------------------------------------
    // Constructors
    //------------------------------------------------------------------------------

    /// Construct a widget from its options object.
    ///
    /// ```js
    ///   const rzp = new Razorpay({ key, amount, order_id, handler, ... });
    /// ```
    #[wasm_bindgen(constructor, catch)]
    pub fn new(options: &JsValue) -> Result<JsRazorpay, JsValue>;

    //------------------------------------------------------------------------------
    // Instance Methods
    //------------------------------------------------------------------------------

    /// `rzp.open()` → shows the modal
    #[wasm_bindgen(method, catch, js_name = open)]
    pub fn open(this: &JsRazorpay) -> Result<(), JsValue>;

    /// `rzp.close()` → hides the modal
    #[wasm_bindgen(method, catch, js_name = close)]
    pub fn close(this: &JsRazorpay) -> Result<(), JsValue>;

    /// `rzp.on("payment.failed", cb)`
    #[wasm_bindgen(method, catch, js_name = on)]
    pub fn on(this: &JsRazorpay, event: &str, callback: &Function) -> Result<(), JsValue>;
}
