//! The preview session: ties the live tree, block index, scroll translator,
//! reconciler and diagram manager to a host surface.
//!
//! Everything here runs one logical event at a time. The host replays tree
//! mutations onto its surface and answers layout questions; the preview
//! decides what changes.

use web_time::Instant;

use crate::block_index::BlockIndex;
use crate::clipboard::{COPIED_TOOLTIP, CopyFeedback, code_block_text, copy_button_at};
use crate::diagram::{
    ActionOutcome, BUTTON_CLASS, CompileJob, DiagramAction, DiagramManager, MountOutcome,
};
use crate::error::DiagramError;
use crate::keymap::{KeyCommand, KeyInput, ScrollMotion, ZoomCommand, resolve};
use crate::message::InboundMessage;
use crate::parse::FRAGMENT_ROOT;
use crate::reconcile::Reconciler;
use crate::scroll::{LayoutProbe, ScrollTranslator};
use crate::session::SessionSnapshot;
use crate::settings::{PreviewConfig, Settings};
use crate::store::KeyValueStore;
use crate::tree::{LiveTree, NodeId, TreeMutation};

/// The surface a preview renders into.
pub trait PreviewHost: LayoutProbe {
    /// Replay tree mutations, in order.
    fn apply_mutations(&mut self, mutations: Vec<TreeMutation>);

    fn scroll_to(&mut self, top: f64);

    fn scroll_by(&mut self, delta: f64);

    /// Base for resolving relative links.
    fn set_base(&mut self, base: &str);

    fn set_theme(&mut self, theme: &str);

    /// Font size of the content root.
    fn set_font_size(&mut self, size: &str);

    /// Briefly show the zoom level.
    fn announce_zoom(&mut self, label: &str);

    /// Start compiling; results come back through
    /// [`Preview::complete_diagram`].
    fn spawn_compile(&mut self, jobs: Vec<CompileJob>);

    /// Write to the clipboard; success comes back through
    /// [`Preview::copy_succeeded`].
    fn write_clipboard(&mut self, text: String, button: NodeId);

    fn show_tooltip(&mut self, anchor: NodeId, text: &str);

    fn session_store(&mut self) -> &mut dyn KeyValueStore;

    fn settings_store(&mut self) -> &mut dyn KeyValueStore;

    /// Drop everything rendered so far. A fresh preview follows.
    fn reset(&mut self);
}

#[derive(Debug)]
pub struct Preview {
    config: PreviewConfig,
    tree: LiveTree,
    blocks: BlockIndex,
    scroll: ScrollTranslator,
    reconciler: Reconciler,
    diagrams: DiagramManager,
    settings: Settings,
    feedback: CopyFeedback,
    base: String,
    lcount: Option<u32>,
}

impl Preview {
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            tree: LiveTree::new(FRAGMENT_ROOT),
            blocks: BlockIndex::new(),
            scroll: ScrollTranslator::new(),
            reconciler: Reconciler::new(),
            diagrams: DiagramManager::new(config.diagram.clone()),
            settings: Settings::new(&config),
            feedback: CopyFeedback::default(),
            base: String::new(),
            lcount: None,
            config,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn tree(&self) -> &LiveTree {
        &self.tree
    }

    pub fn blocks(&self) -> &BlockIndex {
        &self.blocks
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn diagrams(&self) -> &DiagramManager {
        &self.diagrams
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn lcount(&self) -> Option<u32> {
        self.lcount
    }

    /// Apply theme and persisted settings to a fresh host.
    pub fn attach(&mut self, host: &mut impl PreviewHost) {
        if let Some(theme) = self.settings.theme() {
            host.set_theme(theme);
        }
        if !self.settings.zoom_enabled() {
            return;
        }
        if let Err(err) = self.settings.load(host.settings_store()) {
            tracing::warn!(target: "peek::session", error = %err, "ignoring stored zoom level");
        }
        let silent = self.settings.initial_apply_is_silent();
        self.apply_zoom(host, silent);
    }

    pub fn handle_message(
        &mut self,
        message: InboundMessage,
        host: &mut impl PreviewHost,
        now: Instant,
    ) {
        tracing::trace!(target: "peek::transport", action = message.action(), "message");
        match message {
            InboundMessage::Show { html, lcount } => self.show(&html, Some(lcount), host, now),
            InboundMessage::Scroll { line } => self.scroll_to_line(line, host),
            InboundMessage::Base { base } => self.set_base(base, host),
            InboundMessage::Unknown => {}
        }
    }

    /// Reconcile a new rendering into the live tree.
    ///
    /// Scrolling is left to the host's resize notification, which replays
    /// the last requested line once the new layout settles.
    pub fn show(
        &mut self,
        html: &str,
        lcount: Option<u32>,
        host: &mut impl PreviewHost,
        now: Instant,
    ) {
        self.lcount = lcount;
        let outcome = self.reconciler.apply(&mut self.tree, html);
        self.flush(host);

        if outcome.structure_changed || self.blocks.is_stale(&self.tree) {
            self.blocks.rebuild(&self.tree);
        }
        self.diagrams.prune(&self.tree);
        if !outcome.added_diagrams.is_empty() {
            self.diagrams.schedule(now);
        }
    }

    pub fn scroll_to_line(&mut self, line: u32, host: &mut impl PreviewHost) {
        let plan = self
            .scroll
            .request(line, &self.blocks, &self.tree, self.lcount, &*host);
        if let Some(plan) = plan {
            host.scroll_to(plan.top);
        }
    }

    pub fn set_base(&mut self, base: String, host: &mut impl PreviewHost) {
        host.set_base(&base);
        self.base = base;
    }

    /// The content was laid out again; keep the last line centered.
    pub fn on_resize(&mut self, host: &mut impl PreviewHost) {
        let plan = self
            .scroll
            .replay(&self.blocks, &self.tree, self.lcount, &*host);
        if let Some(plan) = plan {
            host.scroll_to(plan.top);
        }
    }

    /// Returns whether the key was handled.
    pub fn on_key(&mut self, input: KeyInput<'_>, host: &mut impl PreviewHost) -> bool {
        let Some(command) = resolve(input, self.config.ctx) else {
            return false;
        };
        match command {
            KeyCommand::Zoom(zoom) => self.zoom(zoom, host),
            KeyCommand::Scroll(scroll) => {
                match scroll.motion(host.viewport_height(), host.document_height()) {
                    ScrollMotion::By(delta) => host.scroll_by(delta),
                    ScrollMotion::To(top) => host.scroll_to(top),
                }
            }
        }
        true
    }

    pub fn zoom(&mut self, command: ZoomCommand, host: &mut impl PreviewHost) {
        if !self.settings.zoom_enabled() {
            return;
        }
        self.settings.zoom(command);
        self.apply_zoom(host, false);
    }

    fn apply_zoom(&mut self, host: &mut impl PreviewHost, silent: bool) {
        host.set_font_size(&self.settings.font_size());
        if !silent {
            host.announce_zoom(&self.settings.font_size());
        }
        if let Err(err) = self.settings.persist(host.settings_store()) {
            tracing::warn!(target: "peek::session", error = %err, "zoom level not persisted");
        }
    }

    /// Handle a click inside the content. Returns whether it hit a control.
    pub fn on_click(&mut self, target: NodeId, host: &mut impl PreviewHost) -> bool {
        if let Some(button) = copy_button_at(&self.tree, target) {
            if let Some(text) = code_block_text(&self.tree, button) {
                host.write_clipboard(text, button);
            }
            return true;
        }

        let Some(button) = self.tree.closest(target, |t, n| t.has_class(n, BUTTON_CLASS)) else {
            return false;
        };
        let Some(action) = self
            .tree
            .attr(button, "data-action")
            .and_then(DiagramAction::parse)
        else {
            return true;
        };
        match self
            .diagrams
            .apply_action(&mut self.tree, button, action, &*host)
        {
            ActionOutcome::Transformed(_) => self.flush(host),
            ActionOutcome::CopySource(source) => host.write_clipboard(source, button),
            ActionOutcome::Unchanged => {}
        }
        true
    }

    /// The clipboard accepted the text copied from `button`.
    pub fn copy_succeeded(&mut self, button: NodeId, host: &mut impl PreviewHost, now: Instant) {
        if !self.feedback.acknowledge(&mut self.tree, button, now) {
            return;
        }
        self.flush(host);
        host.show_tooltip(button, COPIED_TOOLTIP);
    }

    /// The user toggled a disclosure widget on the surface itself.
    pub fn disclosure_toggled(&mut self, node: NodeId, open: bool) {
        self.tree
            .sync_attribute(node, "open", open.then_some(""));
    }

    /// Fire whatever timers are due.
    pub fn poll_timers(&mut self, host: &mut impl PreviewHost, now: Instant) {
        let jobs = self.diagrams.take_due(&self.tree, now);
        if !jobs.is_empty() {
            host.spawn_compile(jobs);
        }
        if !self.feedback.expire(&mut self.tree, now).is_empty() {
            self.flush(host);
        }
    }

    /// Earliest pending timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.diagrams.deadline(), self.feedback.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Hand a compilation result back.
    pub fn complete_diagram(
        &mut self,
        job: CompileJob,
        result: Result<String, DiagramError>,
        host: &mut impl PreviewHost,
    ) {
        let svg = match result {
            Ok(svg) => svg,
            Err(err) => {
                tracing::warn!(target: "peek::diagram", key = %job.key, error = %err, "diagram not rendered");
                self.diagrams.abandon(&job);
                return;
            }
        };
        let MountOutcome::Mounted { viewport, frame } =
            self.diagrams.mount(&mut self.tree, &job, &svg)
        else {
            return;
        };
        self.flush(host);
        if let Some(frame) = frame {
            if self
                .diagrams
                .reserve_height(&mut self.tree, frame, viewport, &*host)
            {
                self.flush(host);
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            base: self.base.clone(),
            html: self.tree.inner_html(self.tree.root()),
            lcount: self.lcount,
            line: self.scroll.last_line(),
        }
    }

    pub fn save_session(&self, host: &mut impl PreviewHost) {
        if let Err(err) = self.snapshot().save(host.session_store()) {
            tracing::warn!(target: "peek::session", error = %err, "session not saved");
        }
    }

    /// Replay a snapshot the way live messages arrive: base, show, scroll.
    pub fn restore(&mut self, snapshot: SessionSnapshot, host: &mut impl PreviewHost, now: Instant) {
        self.set_base(snapshot.base, host);
        self.show(&snapshot.html, snapshot.lcount, host, now);
        if let Some(line) = snapshot.line {
            self.scroll_to_line(line, host);
        }
    }

    pub fn restore_session(&mut self, host: &mut impl PreviewHost, now: Instant) {
        match SessionSnapshot::load(host.session_store()) {
            Ok(Some(snapshot)) => self.restore(snapshot, host, now),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(target: "peek::session", error = %err, "discarding stored session");
            }
        }
    }

    fn flush(&mut self, host: &mut impl PreviewHost) {
        let mutations = self.tree.take_mutations();
        if !mutations.is_empty() {
            host.apply_mutations(mutations);
        }
    }
}
