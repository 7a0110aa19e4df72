mod bindings;
mod checkout_component;
mod client;
mod components;
mod context;
mod controller;
mod dom;
mod error;
mod interop;
mod logging;
mod transport;

pub use bindings::*;
pub use checkout_component::*;
pub use client::*;
pub use components::*;
pub use context::*;
pub use controller::*;
pub use dom::*;
pub use error::*;
pub use interop::*;
pub use logging::*;
pub use transport::*;
