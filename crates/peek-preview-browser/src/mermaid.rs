//! Bindings to the page's global `mermaid` object.

use js_sys::{Object, Reflect};
use peek_preview_core::{DiagramCompiler, DiagramError};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mermaid, js_name = initialize, catch)]
    fn mermaid_initialize(config: &JsValue) -> Result<(), JsValue>;

    /// Resolves to `{ svg, bindFunctions }`.
    #[wasm_bindgen(js_namespace = mermaid, js_name = render, catch)]
    async fn mermaid_render(id: &str, definition: &str) -> Result<JsValue, JsValue>;
}

/// Configure mermaid for manual rendering in the page theme.
pub fn initialize(theme: Option<&str>) {
    let config = Object::new();
    let mermaid_theme = match theme {
        Some("dark") => "dark",
        _ => "default",
    };
    let _ = Reflect::set(&config, &"startOnLoad".into(), &JsValue::FALSE);
    let _ = Reflect::set(&config, &"theme".into(), &mermaid_theme.into());
    if let Err(e) = mermaid_initialize(&config) {
        tracing::warn!("mermaid unavailable, diagrams stay unrendered: {:?}", e);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MermaidCompiler;

impl DiagramCompiler for MermaidCompiler {
    async fn compile(&self, render_id: &str, definition: &str) -> Result<String, DiagramError> {
        let rendered = mermaid_render(render_id, definition)
            .await
            .map_err(|e| DiagramError::Compile {
                render_id: render_id.to_string(),
                message: error_message(&e),
            })?;
        Reflect::get(&rendered, &"svg".into())
            .ok()
            .and_then(|svg| svg.as_string())
            .filter(|svg| !svg.is_empty())
            .ok_or_else(|| DiagramError::Empty {
                render_id: render_id.to_string(),
            })
    }
}

fn error_message(e: &JsValue) -> String {
    Reflect::get(e, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", e))
}
