//! Browser host for the peek live preview.
//!
//! Mirrors the core's live tree into the page, answers layout queries with
//! `getBoundingClientRect`, and feeds WebSocket frames, keyboard and click
//! events into a [`Preview`](peek_preview_core::Preview). Assumes a
//! `wasm32-unknown-unknown` target.
//!
//! # Architecture
//!
//! - `mirror`: replays tree mutations onto DOM nodes
//! - `host`: the page as a `PreviewHost`
//! - `transport`: WebSocket connection
//! - `storage`: Web Storage behind the key-value seam
//! - `mermaid`: diagram compilation through the page's mermaid
//! - `app`: event wiring and timers

pub mod app;
pub mod host;
pub mod mermaid;
pub mod mirror;
pub mod storage;
pub mod telemetry;
pub mod transport;

pub use peek_preview_core;

pub use app::App;
pub use host::{BrowserHost, HostEvent};
pub use mirror::DomMirror;
pub use storage::WebStore;

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn start() {
    telemetry::init();
    let started = app::read_config().and_then(App::start);
    match started {
        // The app lives as long as the page.
        Ok(app) => std::mem::forget(app),
        Err(e) => tracing::error!("Preview failed to start: {:?}", e),
    }
}
