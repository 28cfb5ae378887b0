//! # Block tree
//!
//! The composition model: a [`Block`] owns an ordered collection of
//! [`Member`]s (markup text, [`crate::url::Url`]s, nested blocks and nested
//! [`Group`]s) addressed through slash-delimited paths.
//!
//! The path operations come in two flavors with different guarantees:
//!
//! - **Lookup-only** (`get`, `valid_path`, `subpaths`, `render_by_path`):
//!   never mutate the tree. A missing segment is a [`PathError::NotFound`].
//! - **Create-mode** (`add_p`, `set`): missing interior segments are created
//!   as empty groups on the way down. Existing members are never overwritten
//!   by the walk itself; a leaf in the middle of the path is a
//!   [`PathError::NotAGroup`] in both modes.
//!
//! Reads see through trivial nesting: a group holding exactly one member at
//! index 0 collapses to that member, repeatedly, so `get("slot")` after a
//! single `add_p("slot", ..)` hands back the member rather than a one-entry
//! group.
//!
//! Rendering is recursive member concatenation, overridable per block by a
//! custom renderer and trumped by a bound template (see [`crate::render`]).

pub mod block;
pub mod member;
pub mod path;

pub use block::Block;
pub use member::{Group, Key, Member};
pub use path::PathError;
