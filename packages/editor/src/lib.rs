//! # Screenkit Editor
//!
//! Document editing engine for screen definitions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: ScreenDocument, components, state    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: single-writer editing state         │
//! │  - Copy-on-write tree mutations             │
//! │  - Bounded undo/redo over snapshots         │
//! │  - Selection and clipboard                  │
//! │  - Validation after every change            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: registry sync                      │
//! │  - Save with optimistic concurrency         │
//! │  - Three-way conflict detection / merge     │
//! │  - Publish, rollback, live data streams     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are values**: a mutation never touches the document it
//!    reads, so history entries stay valid
//! 2. **Rejected means untouched**: a failed mutation leaves no trace
//! 3. **Findings, not failures**: validation problems are reported, only
//!    errors block publish
//! 4. **Conflicts at save time**: divergence is detected when saving or on
//!    a remote notification, never continuously
//!
//! ## Usage
//!
//! ```rust,ignore
//! use screenkit_editor::{Editor, EditorConfig};
//! use screenkit_model::{ComponentType, ScreenDocument};
//!
//! let mut editor = Editor::with_document(
//!     EditorConfig::default(),
//!     ScreenDocument::new("orders", "Orders"),
//! );
//!
//! let form = editor.add_component(ComponentType::Form, None)?;
//! editor.add_component_to_parent(ComponentType::Input, &form)?;
//!
//! editor.undo();
//! assert!(editor.can_redo());
//! ```

pub mod clipboard;
pub mod conflict;
pub mod editor;
mod errors;
pub mod executor;
pub mod mutations;
pub mod persistence;
pub mod selection;
pub mod session;
pub mod tree;
pub mod undo_stack;

pub use clipboard::{Clipboard, ClipboardOperation};
pub use conflict::{analyze, auto_merge, changed_keys, DraftConflict, MergeAnalysis};
pub use editor::{Editor, EditorConfig};
pub use errors::EditorError;
pub use executor::{
    ActionExecutor, ActionOutcome, ActionRequest, ActionResponse, ExecutionContext, ExecutorError,
    HttpExecutor,
};
pub use mutations::{MoveDirection, Mutation, MutationError};
pub use persistence::{AssetContext, AssetRegistry, MemoryRegistry, PersistenceError, StoredDocument};
pub use selection::Selection;
pub use session::{EditSession, RemoteUpdate, SaveOutcome, SaveTicket};
pub use undo_stack::{HistoryStack, DEFAULT_HISTORY_LIMIT};
