//! WebSocket connection to the preview server.

use gloo_events::EventListener;
use js_sys::{ArrayBuffer, Uint8Array};
use peek_preview_core::{Connection, Connector, PreviewError, TransportEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use wasm_bindgen::JsCast;
use web_sys::{BinaryType, CloseEvent, MessageEvent, WebSocket};

pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for WsConnector {
    type Conn = WsConnection;

    async fn connect(&self) -> Result<WsConnection, PreviewError> {
        let socket = WebSocket::new(&self.url)
            .map_err(|e| PreviewError::Transport(format!("{:?}", e)))?;
        socket.set_binary_type(BinaryType::Arraybuffer);

        let (tx, events) = mpsc::unbounded_channel();

        let frames = tx.clone();
        let on_message = EventListener::new(&socket, "message", move |event| {
            let Some(event) = event.dyn_ref::<MessageEvent>() else {
                return;
            };
            let data = event.data();
            let bytes = if let Some(buffer) = data.dyn_ref::<ArrayBuffer>() {
                Uint8Array::new(buffer).to_vec()
            } else if let Some(text) = data.as_string() {
                text.into_bytes()
            } else {
                tracing::debug!("Ignoring non-text frame: {:?}", data);
                return;
            };
            let _ = frames.send(TransportEvent::Frame(bytes));
        });

        let on_close = EventListener::new(&socket, "close", move |event| {
            let clean = event
                .dyn_ref::<CloseEvent>()
                .is_some_and(|close| close.was_clean());
            let _ = tx.send(TransportEvent::Closed { clean });
        });

        tracing::debug!(target: "peek::transport", url = %self.url, "socket opened");
        Ok(WsConnection {
            socket,
            events,
            _listeners: [on_message, on_close],
        })
    }
}

pub struct WsConnection {
    socket: WebSocket,
    events: UnboundedReceiver<TransportEvent>,
    _listeners: [EventListener; 2],
}

impl Connection for WsConnection {
    async fn next_event(&mut self) -> TransportEvent {
        self.events
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed { clean: false })
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        let _ = self.socket.close();
    }
}
