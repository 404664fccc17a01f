//! Keyboard shortcuts.

use crate::settings::HostContext;

/// Pixels per line-wise scroll.
pub const LINE_STEP: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput<'a> {
    /// `KeyboardEvent.key`.
    pub key: &'a str,
    pub ctrl: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomCommand {
    In,
    Out,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    LineDown,
    LineUp,
    HalfPageDown,
    HalfPageUp,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollMotion {
    By(f64),
    To(f64),
}

impl ScrollCommand {
    pub fn motion(self, viewport_height: f64, document_height: f64) -> ScrollMotion {
        match self {
            ScrollCommand::LineDown => ScrollMotion::By(LINE_STEP),
            ScrollCommand::LineUp => ScrollMotion::By(-LINE_STEP),
            ScrollCommand::HalfPageDown => ScrollMotion::By(viewport_height / 2.0),
            ScrollCommand::HalfPageUp => ScrollMotion::By(-viewport_height / 2.0),
            ScrollCommand::Top => ScrollMotion::To(0.0),
            ScrollCommand::Bottom => ScrollMotion::To(document_height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Zoom(ZoomCommand),
    Scroll(ScrollCommand),
}

/// Map a key press to a command.
///
/// Ctrl chords are only ours inside a webview; anywhere else the browser's
/// own zoom stays in charge and the plain map applies.
pub fn resolve(input: KeyInput<'_>, ctx: HostContext) -> Option<KeyCommand> {
    if input.ctrl && ctx == HostContext::Webview {
        let zoom = match input.key {
            "=" => ZoomCommand::In,
            "-" => ZoomCommand::Out,
            "0" => ZoomCommand::Reset,
            _ => return None,
        };
        return Some(KeyCommand::Zoom(zoom));
    }
    let scroll = match input.key {
        "j" => ScrollCommand::LineDown,
        "k" => ScrollCommand::LineUp,
        "d" => ScrollCommand::HalfPageDown,
        "u" => ScrollCommand::HalfPageUp,
        "g" => ScrollCommand::Top,
        "G" => ScrollCommand::Bottom,
        _ => return None,
    };
    Some(KeyCommand::Scroll(scroll))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: &str, ctrl: bool) -> KeyInput<'_> {
        KeyInput { key, ctrl }
    }

    #[test]
    fn test_plain_keys() {
        let ctx = HostContext::Browser;
        assert_eq!(
            resolve(key("j", false), ctx),
            Some(KeyCommand::Scroll(ScrollCommand::LineDown))
        );
        assert_eq!(
            resolve(key("G", false), ctx),
            Some(KeyCommand::Scroll(ScrollCommand::Bottom))
        );
        assert_eq!(resolve(key("x", false), ctx), None);
    }

    #[test]
    fn test_ctrl_zoom_only_in_webview() {
        assert_eq!(
            resolve(key("=", true), HostContext::Webview),
            Some(KeyCommand::Zoom(ZoomCommand::In))
        );
        assert_eq!(
            resolve(key("0", true), HostContext::Webview),
            Some(KeyCommand::Zoom(ZoomCommand::Reset))
        );
        assert_eq!(resolve(key("=", true), HostContext::Browser), None);
        // Outside a webview ctrl is ignored and the plain map applies.
        assert_eq!(
            resolve(key("d", true), HostContext::Browser),
            Some(KeyCommand::Scroll(ScrollCommand::HalfPageDown))
        );
        assert_eq!(resolve(key("j", true), HostContext::Webview), None);
    }

    #[test]
    fn test_motions() {
        assert_eq!(
            ScrollCommand::HalfPageUp.motion(800.0, 5000.0),
            ScrollMotion::By(-400.0)
        );
        assert_eq!(
            ScrollCommand::Bottom.motion(800.0, 5000.0),
            ScrollMotion::To(5000.0)
        );
    }
}
