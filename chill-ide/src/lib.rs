//! Editor support for CHILL.
//!
//! `QueryService` answers completion, hover, definition, references,
//! outline and diagnostic queries over one `chill_core::Analysis`.
//! `Workspace` keeps the latest analysis of every open document and
//! replaces it atomically when the text changes; SEIZEs in one
//! document are satisfied by what the other open documents GRANT.
//!
//! The crate does no I/O and speaks no wire protocol; an editor shell
//! maps these results onto its own transport.

pub mod docs;
pub mod query;
pub mod workspace;

pub use chill_core::span::{Position, Span};
pub use query::{
    range_of, CompletionItem, CompletionKind, DocumentSymbol, Hover, Marker, QueryService, Range,
};
pub use workspace::{PendingUpdate, UpdateOutcome, Workspace};
