//! Page wiring: events in, preview calls out.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use gloo_timers::callback::Timeout;
use peek_preview_core::{KeyInput, Preview, PreviewConfig, PreviewError, run_supervised};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Element, KeyboardEvent, ResizeObserver};
use web_time::Instant;

use crate::host::{BrowserHost, HostEvent};
use crate::mermaid;
use crate::transport::WsConnector;

pub const CONFIG_ID: &str = "peek-config";

pub struct App {
    preview: Rc<RefCell<Preview>>,
    host: Rc<RefCell<BrowserHost>>,
    timer: RefCell<Option<Timeout>>,
    listeners: RefCell<Vec<EventListener>>,
    resize: RefCell<Option<(ResizeObserver, Closure<dyn FnMut()>)>>,
}

/// Read the JSON config the page embeds in `#peek-config`.
pub fn read_config() -> Result<PreviewConfig, PreviewError> {
    let raw = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CONFIG_ID))
        .and_then(|e| e.text_content())
        .ok_or_else(|| PreviewError::Host(format!("missing #{CONFIG_ID}")))?;
    PreviewConfig::from_json(&raw)
}

impl App {
    pub fn start(config: PreviewConfig) -> Result<Rc<Self>, PreviewError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let preview = Preview::new(config.clone());
        let host = BrowserHost::new(preview.tree().root(), events_tx)?;

        let app = Rc::new(Self {
            preview: Rc::new(RefCell::new(preview)),
            host: Rc::new(RefCell::new(host)),
            timer: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            resize: RefCell::new(None),
        });

        mermaid::initialize(config.theme.as_deref());
        {
            let mut preview = app.preview.borrow_mut();
            let mut host = app.host.borrow_mut();
            preview.attach(&mut *host);
            preview.restore_session(&mut *host, Instant::now());
        }

        app.listen()?;
        app.spawn_host_events(events_rx);
        app.spawn_transport(config.socket_url());
        app.schedule_timers();
        tracing::info!(server = %config.server_url, ctx = ?config.ctx, "preview started");
        Ok(app)
    }

    fn listen(self: &Rc<Self>) -> Result<(), PreviewError> {
        let window = web_sys::window().ok_or_else(|| PreviewError::Host("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| PreviewError::Host("no document".into()))?;
        let content: Element = self.host.borrow().content().clone();
        let mut listeners = self.listeners.borrow_mut();

        let app = self.clone();
        listeners.push(EventListener::new_with_options(
            &document,
            "keydown",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                let key = event.key();
                let input = KeyInput {
                    key: &key,
                    ctrl: event.ctrl_key(),
                };
                let handled = app
                    .preview
                    .borrow_mut()
                    .on_key(input, &mut *app.host.borrow_mut());
                if handled {
                    event.prevent_default();
                }
            },
        ));

        let app = self.clone();
        listeners.push(EventListener::new(&content, "click", move |event| {
            let Some(target) = event.target().and_then(|t| t.dyn_into::<web_sys::Node>().ok())
            else {
                return;
            };
            let Some(node) = app.host.borrow().node_at(&target) else {
                return;
            };
            app.preview
                .borrow_mut()
                .on_click(node, &mut *app.host.borrow_mut());
            app.schedule_timers();
        }));

        // `toggle` does not bubble.
        let app = self.clone();
        listeners.push(EventListener::new_with_options(
            &content,
            "toggle",
            EventListenerOptions::run_in_capture_phase(),
            move |event| {
                let Some(details) = event.target().and_then(|t| t.dyn_into::<Element>().ok())
                else {
                    return;
                };
                let Some(node) = app.host.borrow().node_at(&details) else {
                    return;
                };
                app.preview
                    .borrow_mut()
                    .disclosure_toggled(node, details.has_attribute("open"));
            },
        ));

        let app = self.clone();
        listeners.push(EventListener::new(&window, "beforeunload", move |_| {
            app.preview
                .borrow()
                .save_session(&mut *app.host.borrow_mut());
        }));
        drop(listeners);

        let app = self.clone();
        let on_resize = Closure::<dyn FnMut()>::new(move || {
            app.preview
                .borrow_mut()
                .on_resize(&mut *app.host.borrow_mut());
        });
        let observer = ResizeObserver::new(on_resize.as_ref().unchecked_ref())
            .map_err(|e| PreviewError::Host(format!("{:?}", e)))?;
        observer.observe(&content);
        *self.resize.borrow_mut() = Some((observer, on_resize));
        Ok(())
    }

    fn spawn_host_events(self: &Rc<Self>, mut events: UnboundedReceiver<HostEvent>) {
        let app = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            while let Some(event) = events.recv().await {
                {
                    let mut preview = app.preview.borrow_mut();
                    let mut host = app.host.borrow_mut();
                    match event {
                        HostEvent::Compiled(job, result) => {
                            preview.complete_diagram(job, result, &mut *host)
                        }
                        HostEvent::Copied(button) => {
                            preview.copy_succeeded(button, &mut *host, Instant::now())
                        }
                    }
                }
                app.schedule_timers();
            }
        });
    }

    fn spawn_transport(self: &Rc<Self>, url: String) {
        let app = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let connector = WsConnector::new(url);
            if let Err(e) = run_supervised(&connector, &app.preview, &app.host).await {
                tracing::error!("Preview connection gave up: {}", e);
            }
        });
    }

    /// Arm one timeout for the preview's earliest deadline.
    pub fn schedule_timers(self: &Rc<Self>) {
        let Some(deadline) = self.preview.borrow().next_deadline() else {
            return;
        };
        let wait = deadline.saturating_duration_since(Instant::now());
        let millis = u32::try_from(wait.as_millis()).unwrap_or(u32::MAX);
        let app = self.clone();
        let timeout = Timeout::new(millis, move || {
            app.preview
                .borrow_mut()
                .poll_timers(&mut *app.host.borrow_mut(), Instant::now());
            // Re-arm outside this callback; replacing the handle drops it.
            wasm_bindgen_futures::spawn_local(async move { app.schedule_timers() });
        });
        // Replacing the handle cancels the previous timeout.
        *self.timer.borrow_mut() = Some(timeout);
    }
}
