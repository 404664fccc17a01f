use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for interactive diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagramConfig {
    /// Pixels moved per pan action.
    pub pan_step: f64,
    pub zoom_step: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    /// Horizontal padding left free when fitting to the frame width.
    pub fit_padding: f64,
    /// Quiet interval before placeholders are compiled.
    pub debounce_ms: u64,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            pan_step: 50.0,
            zoom_step: 0.15,
            zoom_min: 0.25,
            zoom_max: 4.0,
            fit_padding: 32.0,
            debounce_ms: 200,
        }
    }
}

impl DiagramConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Pan and zoom of one diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl ViewState {
    /// Combined CSS transform: translation first, then scale.
    pub fn transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply a view-changing action. Fit and copy are handled by the caller
    /// since they need layout or the tree.
    pub fn apply(&mut self, action: DiagramAction, config: &DiagramConfig) {
        match action {
            DiagramAction::PanUp => self.translate_y += config.pan_step,
            DiagramAction::PanDown => self.translate_y -= config.pan_step,
            DiagramAction::PanLeft => self.translate_x += config.pan_step,
            DiagramAction::PanRight => self.translate_x -= config.pan_step,
            DiagramAction::ZoomIn => {
                self.scale = (self.scale + config.zoom_step).min(config.zoom_max)
            }
            DiagramAction::ZoomOut => {
                self.scale = (self.scale - config.zoom_step).max(config.zoom_min)
            }
            DiagramAction::Reset => self.reset(),
            DiagramAction::Fit | DiagramAction::CopySource => {}
        }
    }

    /// Scale the graphic so it spans `frame_width` minus padding.
    ///
    /// `graphic_width` is the rendered width at the current scale. A
    /// non-positive intrinsic width leaves the view untouched.
    pub fn fit(&mut self, frame_width: f64, graphic_width: f64, config: &DiagramConfig) -> bool {
        let intrinsic = graphic_width / self.scale;
        if !(intrinsic.is_finite() && intrinsic > 0.0) {
            return false;
        }
        self.scale = (frame_width - config.fit_padding) / intrinsic;
        self.translate_x = 0.0;
        self.translate_y = 0.0;
        true
    }
}

/// Toolbar and navigation actions, by their `data-action` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramAction {
    PanUp,
    PanDown,
    PanLeft,
    PanRight,
    ZoomIn,
    ZoomOut,
    Reset,
    Fit,
    CopySource,
}

impl DiagramAction {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "pan-up" => Self::PanUp,
            "pan-down" => Self::PanDown,
            "pan-left" => Self::PanLeft,
            "pan-right" => Self::PanRight,
            "zoom-in" => Self::ZoomIn,
            "zoom-out" => Self::ZoomOut,
            "reset" => Self::Reset,
            "fit" => Self::Fit,
            "copy-source" => Self::CopySource,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PanUp => "pan-up",
            Self::PanDown => "pan-down",
            Self::PanLeft => "pan-left",
            Self::PanRight => "pan-right",
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
            Self::Reset => "reset",
            Self::Fit => "fit",
            Self::CopySource => "copy-source",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_directions() {
        let config = DiagramConfig::default();
        let mut view = ViewState::default();
        view.apply(DiagramAction::PanUp, &config);
        view.apply(DiagramAction::PanLeft, &config);
        assert_eq!((view.translate_x, view.translate_y), (50.0, 50.0));
        view.apply(DiagramAction::PanDown, &config);
        view.apply(DiagramAction::PanRight, &config);
        view.apply(DiagramAction::PanRight, &config);
        assert_eq!((view.translate_x, view.translate_y), (-50.0, 0.0));
    }

    #[test]
    fn test_zoom_clamps() {
        let config = DiagramConfig::default();
        let mut view = ViewState::default();
        for _ in 0..50 {
            view.apply(DiagramAction::ZoomIn, &config);
        }
        assert_eq!(view.scale, 4.0);
        for _ in 0..50 {
            view.apply(DiagramAction::ZoomOut, &config);
        }
        assert_eq!(view.scale, 0.25);
        view.apply(DiagramAction::Reset, &config);
        assert_eq!(view, ViewState::default());
    }

    #[test]
    fn test_fit_to_width() {
        let config = DiagramConfig::default();
        let mut view = ViewState {
            scale: 2.0,
            translate_x: 10.0,
            translate_y: -20.0,
        };
        // Rendered at 2x: 600px wide, 300px intrinsic.
        assert!(view.fit(632.0, 600.0, &config));
        assert_eq!(view.scale, 2.0);
        assert_eq!((view.translate_x, view.translate_y), (0.0, 0.0));

        let mut view = ViewState::default();
        assert!(!view.fit(632.0, 0.0, &config));
        assert_eq!(view, ViewState::default());
    }

    #[test]
    fn test_transform_css() {
        let view = ViewState {
            scale: 1.5,
            translate_x: -50.0,
            translate_y: 0.0,
        };
        assert_eq!(view.transform(), "translate(-50px, 0px) scale(1.5)");
    }

    #[test]
    fn test_action_names() {
        for name in [
            "pan-up", "pan-down", "pan-left", "pan-right", "zoom-in", "zoom-out", "reset", "fit",
            "copy-source",
        ] {
            assert_eq!(DiagramAction::parse(name).map(DiagramAction::as_str), Some(name));
        }
        assert_eq!(DiagramAction::parse("explode"), None);
    }
}
