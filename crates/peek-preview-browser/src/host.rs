//! The page as a [`PreviewHost`].

use std::time::Duration;

use gloo_timers::callback::Timeout;
use peek_preview_core::diagram::compile_all;
use peek_preview_core::{
    CompileJob, DiagramError, KeyValueStore, LayoutProbe, LiveTree, NodeId, PreviewError,
    PreviewHost, TreeMutation,
};
use tokio::sync::mpsc::UnboundedSender;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, HtmlBaseElement, HtmlElement, Window};

use crate::mermaid::MermaidCompiler;
use crate::mirror::DomMirror;
use crate::storage::WebStore;

pub const CONTENT_ID: &str = "peek-markdown-body";
pub const BASE_ID: &str = "peek-base";
pub const ZOOM_LABEL_ID: &str = "peek-zoom-label";

const TOOLTIP_CLASS: &str = "peek-tooltip";
const TOOLTIP_VISIBLE_CLASS: &str = "peek-tooltip--visible";
const ZOOM_LABEL_VISIBLE_CLASS: &str = "peek-zoom-label--visible";
const ZOOM_LABEL_DURATION: Duration = Duration::from_millis(1000);

/// Results of async work the host started, routed back to the preview.
#[derive(Debug)]
pub enum HostEvent {
    Compiled(CompileJob, Result<String, DiagramError>),
    Copied(NodeId),
}

pub struct BrowserHost {
    window: Window,
    document: Document,
    mirror: DomMirror,
    base: Option<HtmlBaseElement>,
    zoom_label: Option<HtmlElement>,
    zoom_label_timer: Option<Timeout>,
    session: WebStore,
    settings: WebStore,
    events: UnboundedSender<HostEvent>,
}

impl BrowserHost {
    pub fn new(root_id: NodeId, events: UnboundedSender<HostEvent>) -> Result<Self, PreviewError> {
        let window = web_sys::window().ok_or_else(|| PreviewError::Host("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| PreviewError::Host("no document".into()))?;
        let content = document
            .get_element_by_id(CONTENT_ID)
            .ok_or_else(|| PreviewError::Host(format!("missing #{CONTENT_ID}")))?;
        let base = document
            .get_element_by_id(BASE_ID)
            .and_then(|e| e.dyn_into::<HtmlBaseElement>().ok());
        let zoom_label = document
            .get_element_by_id(ZOOM_LABEL_ID)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok());

        Ok(Self {
            mirror: DomMirror::new(document.clone(), content, root_id),
            window,
            document,
            base,
            zoom_label,
            zoom_label_timer: None,
            session: WebStore::Session,
            settings: WebStore::Local,
            events,
        })
    }

    pub fn mirror(&self) -> &DomMirror {
        &self.mirror
    }

    pub fn content(&self) -> &Element {
        self.mirror.root()
    }

    /// Map a DOM event target back into the live tree.
    pub fn node_at(&self, target: &web_sys::Node) -> Option<NodeId> {
        self.mirror.node_at(target)
    }

    fn rect(&self, node: NodeId) -> Option<web_sys::DomRect> {
        Some(self.mirror.element(node)?.get_bounding_client_rect())
    }
}

impl LayoutProbe for BrowserHost {
    fn client_top(&self, _tree: &LiveTree, node: NodeId) -> f64 {
        self.rect(node).map(|r| r.top()).unwrap_or(0.0)
    }

    fn height(&self, _tree: &LiveTree, node: NodeId) -> f64 {
        self.rect(node).map(|r| r.height()).unwrap_or(0.0)
    }

    fn width(&self, _tree: &LiveTree, node: NodeId) -> f64 {
        self.rect(node).map(|r| r.width()).unwrap_or(0.0)
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0)
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn document_height(&self) -> f64 {
        self.document
            .body()
            .map(|body| f64::from(body.scroll_height()))
            .unwrap_or(0.0)
    }
}

impl PreviewHost for BrowserHost {
    fn apply_mutations(&mut self, mutations: Vec<TreeMutation>) {
        for mutation in mutations {
            if let Err(e) = self.mirror.apply(mutation) {
                tracing::warn!("DOM mirror out of step: {:?}", e);
            }
        }
    }

    fn scroll_to(&mut self, top: f64) {
        self.window.scroll_to_with_x_and_y(self.window.scroll_x().unwrap_or(0.0), top);
    }

    fn scroll_by(&mut self, delta: f64) {
        self.window.scroll_by_with_x_and_y(0.0, delta);
    }

    fn set_base(&mut self, base: &str) {
        if let Some(element) = &self.base {
            element.set_href(base);
        }
    }

    fn set_theme(&mut self, theme: &str) {
        if let Some(body) = self.document.body() {
            let _ = body.set_attribute("data-theme", theme);
        }
    }

    fn set_font_size(&mut self, size: &str) {
        if let Some(content) = self.mirror.root().dyn_ref::<HtmlElement>() {
            let _ = content.style().set_property("font-size", size);
        }
    }

    fn announce_zoom(&mut self, label: &str) {
        let Some(element) = self.zoom_label.clone() else {
            return;
        };
        element.set_text_content(Some(label));
        let _ = element.class_list().add_1(ZOOM_LABEL_VISIBLE_CLASS);
        // Replacing the timer cancels the previous fade.
        self.zoom_label_timer = Some(Timeout::new(
            ZOOM_LABEL_DURATION.as_millis() as u32,
            move || {
                let _ = element.class_list().remove_1(ZOOM_LABEL_VISIBLE_CLASS);
            },
        ));
    }

    fn spawn_compile(&mut self, jobs: Vec<CompileJob>) {
        let events = self.events.clone();
        wasm_bindgen_futures::spawn_local(async move {
            for (job, result) in compile_all(&MermaidCompiler, jobs).await {
                let _ = events.send(HostEvent::Compiled(job, result));
            }
        });
    }

    fn write_clipboard(&mut self, text: String, button: NodeId) {
        let promise = self.window.navigator().clipboard().write_text(&text);
        let events = self.events.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match JsFuture::from(promise).await {
                Ok(_) => {
                    let _ = events.send(HostEvent::Copied(button));
                }
                Err(e) => tracing::debug!("Clipboard write failed: {:?}", e),
            }
        });
    }

    fn show_tooltip(&mut self, anchor: NodeId, text: &str) {
        let (Some(anchor), Some(body)) = (self.mirror.element(anchor), self.document.body()) else {
            return;
        };
        let Ok(tooltip) = self
            .document
            .create_element("span")
            .and_then(|e| e.dyn_into::<HtmlElement>().map_err(Into::into))
        else {
            return;
        };
        tooltip.set_class_name(TOOLTIP_CLASS);
        tooltip.set_text_content(Some(text));
        if body.append_child(&tooltip).is_err() {
            return;
        }

        let rect = anchor.get_bounding_client_rect();
        let left = rect.left() + rect.width() / 2.0 - f64::from(tooltip.offset_width()) / 2.0;
        let top = rect.top() - f64::from(tooltip.offset_height()) - 6.0;
        let style = tooltip.style();
        let _ = style.set_property("left", &format!("{left}px"));
        let _ = style.set_property("top", &format!("{top}px"));

        // Next task, so the transition sees the initial state.
        let fading = tooltip.clone();
        Timeout::new(0, move || {
            let _ = fading.class_list().add_1(TOOLTIP_VISIBLE_CLASS);
        })
        .forget();
        Timeout::new(
            peek_preview_core::clipboard::FEEDBACK_DURATION.as_millis() as u32,
            move || tooltip.remove(),
        )
        .forget();
    }

    fn session_store(&mut self) -> &mut dyn KeyValueStore {
        &mut self.session
    }

    fn settings_store(&mut self) -> &mut dyn KeyValueStore {
        &mut self.settings
    }

    fn reset(&mut self) {
        self.mirror.reset();
    }
}
