//! Browser bindings
//!
//! - [`host`]: `DomHost` over `web_sys`
//! - [`manager`]: Adapter for a JavaScript orchestration manager
//! - [`controller`]: `#[wasm_bindgen]` surface the page talks to

mod controller;
mod host;
mod manager;

pub use controller::{ConnectionHandle, GestureBackendController};
pub use host::WebHost;
pub use manager::JsManager;
