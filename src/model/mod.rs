//! Document model types for wiki content representation.
//!
//! This module defines the block tree handed to the LaTeX templates, the
//! references blocks point at, and the entity chain addressing documents
//! and attachments. The wiki tree is the serde-loadable input of an export.

mod block;
mod entity;
mod parameters;
mod reference;
mod wiki;

pub use block::{BlockKind, ContentBlock, Format};
pub use entity::{EntityReference, EntitySegment, EntityType};
pub use parameters::Parameters;
pub use reference::{ResourceReference, ResourceType, QUERY_STRING};
pub use wiki::{Attachment, Space, WikiDocument, WikiTree};
