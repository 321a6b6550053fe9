//! DOM Module - Arena-based markup tree
//!
//! Implements the tree the minifier rewrites:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - A builder that applies the element policy table while reading tokens

pub mod builder;
pub mod document;
pub mod node;

pub use builder::parse;
pub use document::Document;
pub use node::{Attribute, Closure, Comment, Element, Node, NodeId, NodeKind};
