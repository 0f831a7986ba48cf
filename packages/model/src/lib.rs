//! # Screenkit document model
//!
//! Pure data for a screen definition: the component tree, action bindings
//! and the typed state slice. No editing behavior lives here; the editor,
//! validator and stream crates all operate on these types.

pub mod action;
pub mod component;
pub mod document;
pub mod error;
pub mod props;
pub mod state;
pub mod visitor;

pub use action::{ActionSpec, ComponentActionRef, ScreenAction};
pub use component::{ComponentNode, ComponentProps, ComponentType};
pub use document::{Layout, ScreenDocument};
pub use error::ModelError;
pub use props::{PropSchema, PropSpec};
pub use state::{StateDefinition, TypeTag};
pub use visitor::{walk_component, walk_document, Visitor};
