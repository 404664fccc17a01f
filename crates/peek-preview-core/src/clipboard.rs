//! Copy affordances and the transient "copied" acknowledgement.

use std::time::Duration;

use web_time::Instant;

use crate::parse::parse_html_fragment;
use crate::tree::{LiveTree, NodeId};

pub const COPY_BUTTON_CLASS: &str = "peek-copy-btn";
pub const COPIED_CLASS: &str = "peek-copy-btn--copied";
pub const FEEDBACK_DURATION: Duration = Duration::from_millis(2000);
pub const COPIED_TOOLTIP: &str = "Copied!";
const CHECK_ICON_CLASS: &str = "peek-check-icon";

const CHECK_ICON: &str = concat!(
    r#"<svg class="peek-check-icon" width="16" height="16" viewBox="0 0 16 16" fill="currentColor">"#,
    r#"<path d="M13.8 4.2 6 12 2.2 8.2l1.1-1.1L6 9.8l6.7-6.7z"></path></svg>"#
);

/// The code-block copy button at or above `target`.
pub fn copy_button_at(tree: &LiveTree, target: NodeId) -> Option<NodeId> {
    tree.closest(target, |t, n| t.has_class(n, COPY_BUTTON_CLASS))
}

/// Text of the first `pre code` next to the button.
pub fn code_block_text(tree: &LiveTree, button: NodeId) -> Option<String> {
    let block = tree.parent(button)?;
    let code = tree.find(block, |t, n| {
        t.tag(n) == Some("code")
            && t.parent(n)
                .and_then(|p| t.closest(p, |t, a| t.tag(a) == Some("pre")))
                .is_some_and(|pre| t.is_inclusive_ancestor(block, pre))
    })?;
    Some(tree.text_content(code))
}

#[derive(Debug)]
struct Acknowledgement {
    button: NodeId,
    icon: NodeId,
    saved: Vec<NodeId>,
    until: Instant,
}

/// Swaps a button's content for a check icon after a successful copy and
/// puts it back once the feedback interval is over.
#[derive(Debug)]
pub struct CopyFeedback {
    duration: Duration,
    pending: Vec<Acknowledgement>,
}

impl Default for CopyFeedback {
    fn default() -> Self {
        Self::new(FEEDBACK_DURATION)
    }
}

impl CopyFeedback {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            pending: Vec::new(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|a| a.until).min()
    }

    /// Show the acknowledgement on `button`. A button already showing it
    /// only has its interval extended.
    pub fn acknowledge(&mut self, tree: &mut LiveTree, button: NodeId, now: Instant) -> bool {
        if !tree.is_connected(button) {
            return false;
        }
        let until = now + self.duration;
        if let Some(existing) = self.pending.iter_mut().find(|a| a.button == button) {
            existing.until = until;
            return true;
        }

        let saved = tree.children(button).to_vec();
        for child in &saved {
            tree.detach(*child);
        }
        let icon_tree = parse_html_fragment(CHECK_ICON);
        let Some(icon) = icon_tree
            .first_child(icon_tree.root())
            .and_then(|svg| tree.import(&icon_tree, svg))
        else {
            return false;
        };
        tree.append_child(button, icon);
        tree.add_class(button, COPIED_CLASS);

        self.pending.push(Acknowledgement {
            button,
            icon,
            saved,
            until,
        });
        true
    }

    /// Revert every acknowledgement whose interval has passed. Returns the
    /// buttons that were reverted.
    ///
    /// A button re-rendered in the meantime already shows fresh content; its
    /// saved children are dropped instead of restored.
    pub fn expire(&mut self, tree: &mut LiveTree, now: Instant) -> Vec<NodeId> {
        let (due, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|a| a.until <= now);
        self.pending = keep;

        let mut reverted = Vec::with_capacity(due.len());
        for ack in due {
            // Reconciliation may have morphed the icon in place.
            let untouched = tree.is_connected(ack.button)
                && tree.parent(ack.icon) == Some(ack.button)
                && tree.has_class(ack.icon, CHECK_ICON_CLASS);
            if untouched {
                tree.remove(ack.icon);
                for child in ack.saved {
                    tree.append_child(ack.button, child);
                }
            } else {
                for child in ack.saved {
                    tree.remove(child);
                }
            }
            if tree.is_connected(ack.button) {
                tree.remove_class(ack.button, COPIED_CLASS);
            }
            reverted.push(ack.button);
        }
        reverted
    }
}
