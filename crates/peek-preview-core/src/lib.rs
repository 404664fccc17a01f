//! Line-synchronized live preview of rendered markdown.
//!
//! An editor streams rendered HTML and cursor positions; this crate keeps a
//! live document tree in step with them without tearing down state the user
//! interacted with, and translates source lines into scroll offsets.
//!
//! # Architecture
//!
//! - `tree`: arena-backed document tree with a mutation log for the host
//! - `parse` / `morph` / `reconcile`: in-place merge of a new fragment
//! - `block_index` / `scroll`: source line to viewport offset
//! - `diagram`: placeholder compilation, mounting and pan/zoom state
//! - `preview`: one session tying the pieces to a [`PreviewHost`]
//! - `transport`: frame loop with reload on unclean close
//!
//! Everything is platform independent; the browser host lives in
//! `peek-preview-browser`.

pub mod block_index;
pub mod clipboard;
pub mod diagram;
pub mod error;
pub mod keymap;
pub mod message;
pub mod morph;
pub mod parse;
pub mod preview;
pub mod reconcile;
pub mod scroll;
pub mod session;
pub mod settings;
pub mod store;
pub mod style;
pub mod transport;
pub mod tree;

#[cfg(test)]
mod test_support;

pub use block_index::{BlockIndex, BlockWindow, LINE_ATTR};
pub use diagram::{CompileJob, DiagramAction, DiagramCompiler, DiagramConfig, DiagramManager, ViewState};
pub use error::{DiagramError, PreviewError, Result, StorageError};
pub use keymap::{KeyCommand, KeyInput, ScrollCommand, ZoomCommand};
pub use message::InboundMessage;
pub use preview::{Preview, PreviewHost};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use scroll::{LayoutProbe, ScrollPlan, ScrollTranslator};
pub use session::SessionSnapshot;
pub use settings::{HostContext, PreviewConfig, Settings};
pub use store::{KeyValueStore, MemoryStore};
pub use transport::{Connection, Connector, SessionEnd, TransportEvent, run_session, run_supervised};
pub use tree::{Attribute, LiveTree, Namespace, NodeData, NodeId, TreeMutation};
