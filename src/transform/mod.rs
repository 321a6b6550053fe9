//! Tree rewriting stages
//!
//! Each stage takes the document by `&mut` and runs to completion before the
//! next one starts:
//! - prune: comment and empty element removal
//! - attributes: Attribute Normalizer
//! - whitespace: Whitespace Collapse Engine
//! - omission: Tag Omission Engine (a read-only plan for the serializer)

pub mod attributes;
pub mod omission;
pub mod prune;
pub mod whitespace;
